//! Store key constants.
//!
//! The values are the strings behind the `kSec*` CoreFoundation constants, so
//! dictionaries keyed by them compare equal to the ones Security.framework
//! builds itself.

// Item class
/// `kSecClass`
pub const CLASS: &str = "class";
/// `kSecClassGenericPassword`
pub const CLASS_GENERIC_PASSWORD: &str = "genp";
/// `kSecClassInternetPassword`
pub const CLASS_INTERNET_PASSWORD: &str = "inet";

// Item attributes
/// `kSecAttrAccessible`
pub const ATTR_ACCESSIBLE: &str = "pdmn";
/// `kSecAttrAccessGroup`
pub const ATTR_ACCESS_GROUP: &str = "agrp";
/// `kSecAttrCreationDate`
pub const ATTR_CREATION_DATE: &str = "cdat";
/// `kSecAttrModificationDate`
pub const ATTR_MODIFICATION_DATE: &str = "mdat";
/// `kSecAttrDescription`
pub const ATTR_DESCRIPTION: &str = "desc";
/// `kSecAttrComment`
pub const ATTR_COMMENT: &str = "icmt";
/// `kSecAttrCreator`
pub const ATTR_CREATOR: &str = "crtr";
/// `kSecAttrType`
pub const ATTR_TYPE: &str = "type";
/// `kSecAttrLabel`
pub const ATTR_LABEL: &str = "labl";
/// `kSecAttrIsInvisible`
pub const ATTR_IS_INVISIBLE: &str = "invi";
/// `kSecAttrIsNegative`
pub const ATTR_IS_NEGATIVE: &str = "nega";
/// `kSecAttrAccount`
pub const ATTR_ACCOUNT: &str = "acct";
/// `kSecAttrService`
pub const ATTR_SERVICE: &str = "svce";
/// `kSecAttrGeneric`
pub const ATTR_GENERIC: &str = "gena";
/// `kSecAttrSecurityDomain`
pub const ATTR_SECURITY_DOMAIN: &str = "sdmn";
/// `kSecAttrServer`
pub const ATTR_SERVER: &str = "srvr";
/// `kSecAttrProtocol`
pub const ATTR_PROTOCOL: &str = "ptcl";
/// `kSecAttrAuthenticationType`
pub const ATTR_AUTHENTICATION_TYPE: &str = "atyp";
/// `kSecAttrPort`
pub const ATTR_PORT: &str = "port";
/// `kSecAttrPath`
pub const ATTR_PATH: &str = "path";

// Search and return options
/// `kSecMatchItemList`
pub const MATCH_ITEM_LIST: &str = "m_ItemList";
/// `kSecReturnData`
pub const RETURN_DATA: &str = "r_Data";
/// `kSecReturnAttributes`
pub const RETURN_ATTRIBUTES: &str = "r_Attributes";
/// `kSecReturnRef`
pub const RETURN_REF: &str = "r_Ref";
/// `kSecUseKeychain`
pub const USE_KEYCHAIN: &str = "u_Keychain";

// Values
/// `kSecValueData`
pub const VALUE_DATA: &str = "v_Data";
/// `kSecValueRef`
pub const VALUE_REF: &str = "v_Ref";
