//! Query construction for item create, update and lookup calls.
//!
//! Updates talk to the store in two parts: a *match* query that identifies
//! the item and a *new attributes* payload with what to write. The store does
//! not return the updated snapshot, so a *refresh* query follows every update.

use zeroize::Zeroize;

use crate::attributes::{Attribute, Attributes};
use crate::keychain::Keychain;
use crate::keys;
use crate::value::{Dictionary, RawRef, Value};

/// Options for [`Item::save_with`](crate::Item::save_with).
#[derive(Debug, Default, Clone, Copy)]
pub struct SaveOptions<'a> {
    /// Keychain to create the item in. Ignored when updating.
    pub keychain: Option<&'a Keychain>,
}

impl<'a> SaveOptions<'a> {
    /// Targets `keychain` when the item is created.
    #[must_use]
    pub const fn keychain(mut self, keychain: &'a Keychain) -> Self {
        self.keychain = Some(keychain);
        self
    }
}

/// Builds the store queries for one item from its current state.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    attributes: &'a Attributes,
    secret: Option<&'a [u8]>,
    persisted: bool,
}

impl<'a> QueryBuilder<'a> {
    /// Captures the item state the queries are built from.
    #[must_use]
    pub const fn new(attributes: &'a Attributes, secret: Option<&'a [u8]>, persisted: bool) -> Self {
        Self {
            attributes,
            secret,
            persisted,
        }
    }

    /// Query for adding the item: return options, target keychain and the
    /// new-attributes payload.
    #[must_use]
    pub fn create(&self, options: SaveOptions<'_>) -> Dictionary {
        let mut query = Dictionary::new();
        if let Some(keychain) = options.keychain.and_then(Keychain::raw) {
            query.insert(keys::USE_KEYCHAIN, keychain);
        }
        query.insert(keys::RETURN_ATTRIBUTES, true);
        query.insert(keys::RETURN_REF, true);
        query.extend(self.new_attributes());
        query
    }

    /// Query identifying `item` for an update.
    #[must_use]
    pub fn update_match(&self, item: RawRef) -> Dictionary {
        self.item_query(item)
    }

    /// Query re-reading the attributes and reference of `item`.
    #[must_use]
    pub fn refresh(&self, item: RawRef) -> Dictionary {
        self.item_query(item)
            .with(keys::RETURN_ATTRIBUTES, true)
            .with(keys::RETURN_REF, true)
    }

    /// Query fetching the secret data of `item`.
    #[must_use]
    pub fn secret(&self, item: RawRef) -> Dictionary {
        self.item_query(item).with(keys::RETURN_DATA, true)
    }

    /// Attributes to write: everything in the mapping except the store-owned
    /// dates, and except the class once the item is persisted, plus the
    /// pending secret.
    #[must_use]
    pub fn new_attributes(&self) -> Dictionary {
        let mut payload: Dictionary = self
            .attributes
            .iter()
            .filter(|(attribute, _)| !attribute.is_read_only())
            .filter(|(attribute, _)| !(self.persisted && **attribute == Attribute::Class))
            .map(|(attribute, value)| (attribute.store_key(), value.to_value()))
            .collect();
        if let Some(secret) = self.secret {
            payload.insert(keys::VALUE_DATA, secret);
        }
        payload
    }

    fn item_query(&self, item: RawRef) -> Dictionary {
        let mut query = Dictionary::new().with(keys::MATCH_ITEM_LIST, vec![Value::Ref(item)]);
        if let Some(class) = self.attributes.get(&Attribute::Class) {
            query.insert(keys::CLASS, class.to_value());
        }
        query
    }
}

/// Wipes secret data from a query once the store call is done.
pub(crate) fn scrub(query: &mut Dictionary) {
    if let Some(Value::Data(mut data)) = query.remove(keys::VALUE_DATA) {
        data.zeroize();
    }
}
