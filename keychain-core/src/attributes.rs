//! Attribute translation between store keys and semantic names.
//!
//! [`Attribute::store_key`] is the canonical table; the reverse direction
//! ([`Attribute::from_store_key`]) is derived from it, so the two can never
//! disagree. Store keys without a semantic name are skipped when decoding.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use strum::IntoEnumIterator;

use crate::class::ItemClass;
use crate::error::{KeychainError, KeychainResult};
use crate::keys;
use crate::value::Value;

/// Semantic name of an item attribute.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Attribute {
    /// When the item is readable (`pdmn`).
    Accessible,
    /// Access group the item belongs to.
    AccessGroup,
    /// Creation date, maintained by the store.
    CreatedAt,
    /// Last modification date, maintained by the store.
    UpdatedAt,
    /// User-visible kind of item, e.g. "application password".
    Description,
    /// Free-form comment.
    Comment,
    /// Four-character creator code.
    Creator,
    /// Four-character type code.
    Type,
    /// User-visible label.
    Label,
    /// Hidden from user interfaces.
    Invisible,
    /// Marks a "never save a password for this" entry.
    Negative,
    /// Account name.
    Account,
    /// Service name (generic passwords).
    Service,
    /// Application-defined data (generic passwords).
    Generic,
    /// Security domain (internet passwords).
    SecurityDomain,
    /// Server host name (internet passwords).
    Server,
    /// Protocol code, e.g. `htps` (internet passwords).
    Protocol,
    /// Authentication scheme code (internet passwords).
    AuthenticationType,
    /// Server port (internet passwords).
    Port,
    /// Path component (internet passwords).
    Path,
    /// Item class. Immutable once the item is persisted.
    Class,
}

impl Attribute {
    /// Store key for this attribute.
    #[must_use]
    pub const fn store_key(self) -> &'static str {
        match self {
            Self::Accessible => keys::ATTR_ACCESSIBLE,
            Self::AccessGroup => keys::ATTR_ACCESS_GROUP,
            Self::CreatedAt => keys::ATTR_CREATION_DATE,
            Self::UpdatedAt => keys::ATTR_MODIFICATION_DATE,
            Self::Description => keys::ATTR_DESCRIPTION,
            Self::Comment => keys::ATTR_COMMENT,
            Self::Creator => keys::ATTR_CREATOR,
            Self::Type => keys::ATTR_TYPE,
            Self::Label => keys::ATTR_LABEL,
            Self::Invisible => keys::ATTR_IS_INVISIBLE,
            Self::Negative => keys::ATTR_IS_NEGATIVE,
            Self::Account => keys::ATTR_ACCOUNT,
            Self::Service => keys::ATTR_SERVICE,
            Self::Generic => keys::ATTR_GENERIC,
            Self::SecurityDomain => keys::ATTR_SECURITY_DOMAIN,
            Self::Server => keys::ATTR_SERVER,
            Self::Protocol => keys::ATTR_PROTOCOL,
            Self::AuthenticationType => keys::ATTR_AUTHENTICATION_TYPE,
            Self::Port => keys::ATTR_PORT,
            Self::Path => keys::ATTR_PATH,
            Self::Class => keys::CLASS,
        }
    }

    /// Semantic attribute for a store key, or `None` if the key is unmapped.
    #[must_use]
    pub fn from_store_key(key: &str) -> Option<Self> {
        Self::iter().find(|attribute| attribute.store_key() == key)
    }

    /// Dates the store maintains itself; never written back.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::CreatedAt | Self::UpdatedAt)
    }

    /// Decodes a store value for this attribute.
    ///
    /// Returns `None` for value kinds an attribute cannot hold (references,
    /// containers) and for unknown class constants.
    #[must_use]
    pub fn decode(self, value: &Value) -> Option<AttributeValue> {
        match (self, value) {
            (Self::Class, Value::String(tag)) => {
                let class = ItemClass::from_store_tag(tag);
                if class.is_none() {
                    log::warn!("skipping unknown item class {tag:?}");
                }
                class.map(AttributeValue::Class)
            }
            (Self::Class, _) => None,
            (_, Value::String(v)) => Some(AttributeValue::Text(v.clone())),
            (_, Value::Data(v)) => Some(AttributeValue::Data(v.clone())),
            (_, Value::Date(v)) => Some(AttributeValue::Date(*v)),
            (_, Value::Bool(v)) => Some(AttributeValue::Bool(*v)),
            (_, Value::Number(v)) => Some(AttributeValue::Number(*v)),
            (_, Value::Ref(_) | Value::Array(_) | Value::Dictionary(_)) => None,
        }
    }
}

/// Value of a semantic attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Text.
    Text(String),
    /// Raw bytes.
    Data(Vec<u8>),
    /// Point in time.
    Date(DateTime<Utc>),
    /// Flag.
    Bool(bool),
    /// Integer.
    Number(i64),
    /// Item class tag.
    Class(ItemClass),
}

impl AttributeValue {
    /// Encodes this value as a store value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(v) => Value::String(v.clone()),
            Self::Data(v) => Value::Data(v.clone()),
            Self::Date(v) => Value::Date(*v),
            Self::Bool(v) => Value::Bool(*v),
            Self::Number(v) => Value::Number(*v),
            Self::Class(v) => Value::String(v.store_tag().to_string()),
        }
    }

    /// Returns the text if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the date if this is a date.
    #[must_use]
    pub const fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the class if this is a class tag.
    #[must_use]
    pub const fn as_class(&self) -> Option<ItemClass> {
        match self {
            Self::Class(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Data(v)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Date(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Number(v)
    }
}

impl From<ItemClass> for AttributeValue {
    fn from(v: ItemClass) -> Self {
        Self::Class(v)
    }
}

/// Attribute mapping of an item.
pub type Attributes = BTreeMap<Attribute, AttributeValue>;

/// Anything settable on an item: an attribute or the secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// The secret payload, held apart from the attribute mapping.
    Password,
    /// A regular attribute.
    Attribute(Attribute),
}

impl Field {
    const PASSWORD: &'static str = "password";
}

impl FromStr for Field {
    type Err = KeychainError;

    fn from_str(name: &str) -> KeychainResult<Self> {
        if name == Self::PASSWORD {
            return Ok(Self::Password);
        }
        Attribute::from_str(name)
            .map(Self::Attribute)
            .map_err(|_| KeychainError::UnknownField(name.to_string()))
    }
}

impl From<Attribute> for Field {
    fn from(attribute: Attribute) -> Self {
        Self::Attribute(attribute)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => f.write_str(Self::PASSWORD),
            Self::Attribute(attribute) => fmt::Display::fmt(attribute, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use test_case::test_case;

    #[test]
    fn test_store_keys_are_unique() {
        let keys: HashSet<&str> = Attribute::iter().map(Attribute::store_key).collect();
        assert_eq!(keys.len(), Attribute::iter().count());
    }

    #[test]
    fn test_every_attribute_round_trips() {
        for attribute in Attribute::iter() {
            assert_eq!(
                Attribute::from_store_key(attribute.store_key()),
                Some(attribute)
            );
        }
    }

    #[test_case("svce", Some(Attribute::Service))]
    #[test_case("acct", Some(Attribute::Account))]
    #[test_case("cdat", Some(Attribute::CreatedAt))]
    #[test_case("class", Some(Attribute::Class))]
    #[test_case("v_Data", None)]
    #[test_case("tomb", None)]
    fn test_from_store_key(key: &str, expected: Option<Attribute>) {
        assert_eq!(Attribute::from_store_key(key), expected);
    }

    #[test_case("service", Field::Attribute(Attribute::Service))]
    #[test_case("updated_at", Field::Attribute(Attribute::UpdatedAt))]
    #[test_case("authentication_type", Field::Attribute(Attribute::AuthenticationType))]
    #[test_case("password", Field::Password)]
    fn test_field_names(name: &str, expected: Field) {
        assert_eq!(name.parse::<Field>().unwrap(), expected);
        assert_eq!(expected.to_string(), name);
    }

    #[test]
    fn test_unknown_field_name() {
        let err = "colour".parse::<Field>().unwrap_err();
        assert!(matches!(err, KeychainError::UnknownField(name) if name == "colour"));
    }

    #[test]
    fn test_decode_class_tag() {
        let value = Value::from("inet");
        assert_eq!(
            Attribute::Class.decode(&value),
            Some(AttributeValue::Class(ItemClass::InternetPassword))
        );
        assert_eq!(Attribute::Class.decode(&Value::from("keys")), None);
        assert_eq!(Attribute::Class.decode(&Value::Bool(true)), None);
    }

    #[test]
    fn test_decode_skips_containers() {
        assert_eq!(Attribute::Label.decode(&Value::Array(vec![])), None);
        assert_eq!(
            Attribute::Port.decode(&Value::Number(443)),
            Some(AttributeValue::Number(443))
        );
    }

    #[test]
    fn test_class_encodes_as_store_tag() {
        assert_eq!(
            AttributeValue::Class(ItemClass::GenericPassword).to_value(),
            Value::from("genp")
        );
    }
}
