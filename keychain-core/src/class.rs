//! Item class registry.
//!
//! The store tags every item with a class constant (`kSecClass`). This module
//! is the single dispatch table from that constant to [`ItemClass`]; it is a
//! static table and never changes at runtime.

use strum::IntoEnumIterator;

use crate::keys;

/// Class of a credential item.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumIter,
    strum::EnumString,
    strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum ItemClass {
    /// Application password (`kSecClassGenericPassword`).
    GenericPassword,
    /// Website / network password (`kSecClassInternetPassword`).
    InternetPassword,
}

impl ItemClass {
    /// Store constant identifying this class.
    #[must_use]
    pub const fn store_tag(self) -> &'static str {
        match self {
            Self::GenericPassword => keys::CLASS_GENERIC_PASSWORD,
            Self::InternetPassword => keys::CLASS_INTERNET_PASSWORD,
        }
    }

    /// Resolves a store class constant. Unknown constants yield `None`.
    #[must_use]
    pub fn from_store_tag(tag: &str) -> Option<Self> {
        Self::iter().find(|class| class.store_tag() == tag)
    }

    /// Store keys that together identify an item of this class; two items of
    /// the same class with equal values for all of them are duplicates.
    #[must_use]
    pub const fn primary_key(self) -> &'static [&'static str] {
        match self {
            Self::GenericPassword => &[keys::ATTR_ACCOUNT, keys::ATTR_SERVICE],
            Self::InternetPassword => &[
                keys::ATTR_ACCOUNT,
                keys::ATTR_SECURITY_DOMAIN,
                keys::ATTR_SERVER,
                keys::ATTR_PROTOCOL,
                keys::ATTR_AUTHENTICATION_TYPE,
                keys::ATTR_PORT,
                keys::ATTR_PATH,
            ],
        }
    }
}
