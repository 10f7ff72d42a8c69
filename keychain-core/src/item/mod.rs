//! Credential items and their synchronization with the store.
//!
//! An [`Item`] mirrors one store entry. Its attribute mapping is a local copy
//! that is written on [`save`](Item::save) and overwritten from the store's
//! snapshot afterwards. The secret is never part of that mapping: a value set
//! through [`set_password`](Item::set_password) waits in a pending slot until
//! the next successful save, and otherwise [`password`](Item::password) asks
//! the store for it on every call.
//!
//! # State
//!
//! ```text
//! Unpersisted --save--> Persisted --save--> Persisted
//!      ^                    |
//!      +-------delete-------+
//! ```
//!
//! `persisted` is exactly "the handle is bound".

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretSlice};

use crate::attributes::{Attribute, AttributeValue, Attributes, Field};
use crate::class::ItemClass;
use crate::error::{KeychainError, KeychainResult, StoreOperation};
use crate::handle::Handle;
use crate::keychain::Keychain;
use crate::keys;
use crate::query::{self, QueryBuilder, SaveOptions};
use crate::store::{StoreClient, StoreOutput};
use crate::value::{Dictionary, RawRef, Value};

/// A credential item (generic or internet password).
pub struct Item {
    handle: Handle,
    attributes: Attributes,
    pending_secret: Option<SecretSlice<u8>>,
}

impl Item {
    /// Creates an unsaved item from a set of fields.
    ///
    /// Every pair goes through [`set_field`](Self::set_field), so a
    /// [`Field::Password`] entry lands in the pending secret. Items without an
    /// explicit class are generic passwords.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::InvalidValue`] if the password is neither text
    /// nor data.
    pub fn new<I, F, V>(client: Arc<dyn StoreClient>, fields: I) -> KeychainResult<Self>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<Field>,
        V: Into<AttributeValue>,
    {
        let mut item = Self::unbound(client);
        for (field, value) in fields {
            item.set_field(field.into(), value.into())?;
        }
        item.attributes
            .entry(Attribute::Class)
            .or_insert(AttributeValue::Class(ItemClass::GenericPassword));
        Ok(item)
    }

    /// Like [`new`](Self::new) with fields named by text (`"service"`,
    /// `"password"`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::UnknownField`] for a name that is neither an
    /// attribute nor `password`.
    pub fn from_fields<I, S, V>(client: Arc<dyn StoreClient>, fields: I) -> KeychainResult<Self>
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<AttributeValue>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, value)| Ok((name.as_ref().parse::<Field>()?, value.into())))
            .collect::<KeychainResult<Vec<(Field, AttributeValue)>>>()?;
        Self::new(client, fields)
    }

    /// Wraps an existing native item without taking ownership of it.
    ///
    /// The attribute mapping starts empty; call [`reload`](Self::reload) to
    /// populate it.
    #[must_use]
    pub fn from_raw(client: Arc<dyn StoreClient>, raw: RawRef) -> Self {
        Self {
            handle: Handle::borrowed(client, raw),
            attributes: Attributes::new(),
            pending_secret: None,
        }
    }

    /// Materializes an item from an attribute dictionary returned by the
    /// store. A reference under `v_Ref` is retained and owned by the item.
    #[must_use]
    pub fn from_dictionary(client: Arc<dyn StoreClient>, dictionary: &Dictionary) -> Self {
        let mut item = Self::unbound(client);
        item.absorb(dictionary);
        item
    }

    fn unbound(client: Arc<dyn StoreClient>) -> Self {
        Self {
            handle: Handle::unbound(client),
            attributes: Attributes::new(),
            pending_secret: None,
        }
    }

    /// `true` once the item exists in the store.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.handle.is_bound()
    }

    /// Native reference of the item, if persisted.
    #[must_use]
    pub const fn raw(&self) -> Option<RawRef> {
        self.handle.raw()
    }

    /// Current value of `attribute`.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> Option<&AttributeValue> {
        self.attributes.get(&attribute)
    }

    /// Text value of `attribute`, if it holds text.
    #[must_use]
    pub fn get_str(&self, attribute: Attribute) -> Option<&str> {
        self.get(attribute).and_then(AttributeValue::as_str)
    }

    /// Sets `attribute` locally; nothing is sent until [`save`](Self::save).
    ///
    /// The class of a persisted item is fixed; changing it is ignored.
    pub fn set(&mut self, attribute: Attribute, value: impl Into<AttributeValue>) {
        if self.class_is_fixed(attribute) {
            log::warn!("ignoring class change of persisted item {:?}", self.handle.raw());
            return;
        }
        self.attributes.insert(attribute, value.into());
    }

    /// Removes `attribute` from the local mapping. The class of a persisted
    /// item is kept.
    pub fn remove(&mut self, attribute: Attribute) -> Option<AttributeValue> {
        if self.class_is_fixed(attribute) {
            return None;
        }
        self.attributes.remove(&attribute)
    }

    /// Sets an attribute or the pending secret.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::InvalidValue`] if the password is neither text
    /// nor data, or if a class given as text names no known class.
    pub fn set_field(&mut self, field: Field, value: AttributeValue) -> KeychainResult<()> {
        match (field, value) {
            (Field::Password, AttributeValue::Text(text)) => self.set_password(text),
            (Field::Password, AttributeValue::Data(data)) => self.set_password(data),
            (Field::Password, _) => {
                return Err(KeychainError::InvalidValue {
                    field: "password",
                    expected: "text or data",
                })
            }
            (Field::Attribute(Attribute::Class), AttributeValue::Text(name)) => {
                let class = name
                    .parse::<ItemClass>()
                    .ok()
                    .or_else(|| ItemClass::from_store_tag(&name))
                    .ok_or(KeychainError::InvalidValue {
                        field: "class",
                        expected: "item class name or store tag",
                    })?;
                self.set(Attribute::Class, class);
            }
            (Field::Attribute(attribute), value) => self.set(attribute, value),
        }
        Ok(())
    }

    const fn class_is_fixed(&self, attribute: Attribute) -> bool {
        matches!(attribute, Attribute::Class) && self.is_persisted()
    }

    /// The local attribute mapping.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Item class, if known.
    #[must_use]
    pub fn class(&self) -> Option<ItemClass> {
        self.get(Attribute::Class).and_then(AttributeValue::as_class)
    }

    /// Stores `secret` in the pending slot. It is written on the next save.
    pub fn set_password(&mut self, secret: impl Into<Vec<u8>>) {
        self.pending_secret = Some(SecretSlice::from(secret.into()));
    }

    /// `true` while a secret set locally has not been saved yet.
    #[must_use]
    pub const fn has_pending_password(&self) -> bool {
        self.pending_secret.is_some()
    }

    /// Returns the secret.
    ///
    /// A pending secret is returned without contacting the store. Otherwise
    /// the data is looked up, which may prompt the user for access.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::NotPersisted`] for an unsaved item without a
    /// pending secret, or the store error of the lookup.
    pub fn password(&self) -> KeychainResult<SecretSlice<u8>> {
        if let Some(pending) = &self.pending_secret {
            return Ok(SecretSlice::from(pending.expose_secret().to_vec()));
        }
        let item = self.require_bound("password")?;
        let output = self
            .client()
            .copy_matching(&self.queries().secret(item))
            .inspect_err(|e| log::warn!("fetching secret of {item:?} failed: {e}"))?;
        let backing = self.transient(output.backing);
        let secret = match output.value {
            Value::Data(data) => Ok(SecretSlice::from(data)),
            _ => Err(KeychainError::UnexpectedResult {
                operation: StoreOperation::CopyMatching,
                expected: "data",
            }),
        };
        drop(backing);
        secret
    }

    /// Saves the item with default options.
    ///
    /// # Errors
    ///
    /// See [`save_with`](Self::save_with).
    pub fn save(&mut self) -> KeychainResult<&mut Self> {
        self.save_with(SaveOptions::default())
    }

    /// Creates the item in the store, or updates it if already persisted.
    ///
    /// On success the pending secret is cleared and the attribute mapping is
    /// replaced with the store's snapshot; a new item also binds its handle.
    /// On failure the item is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing store call, or
    /// [`KeychainError::UnexpectedResult`] if the store's reply has the wrong
    /// shape.
    pub fn save_with(&mut self, options: SaveOptions<'_>) -> KeychainResult<&mut Self> {
        let (operation, output) = match self.handle.raw() {
            Some(item) => (StoreOperation::CopyMatching, self.update(item)?),
            None => (StoreOperation::Add, self.create(options)?),
        };
        let backing = self.transient(output.backing);

        let Value::Dictionary(snapshot) = output.value else {
            return Err(KeychainError::UnexpectedResult {
                operation,
                expected: "attribute dictionary",
            });
        };
        if !self.is_persisted() && !snapshot.contains_key(keys::VALUE_REF) {
            return Err(KeychainError::UnexpectedResult {
                operation,
                expected: "item reference",
            });
        }

        self.pending_secret = None;
        self.absorb(&snapshot);
        drop(backing);
        log::debug!("saved keychain item {:?}", self.handle.raw());
        Ok(self)
    }

    /// Deletes the item from the store and returns it to the unsaved state.
    ///
    /// The local attributes are kept, so a later save creates it again.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::NotPersisted`] for an unsaved item (nothing is
    /// sent), or the store error.
    pub fn delete(&mut self) -> KeychainResult<&mut Self> {
        let item = self.require_bound("delete")?;
        self.client()
            .delete(item)
            .inspect_err(|e| log::warn!("deleting {item:?} failed: {e}"))?;
        self.handle.unbind();
        log::debug!("deleted keychain item {item:?}");
        Ok(self)
    }

    /// Returns the keychain that contains the item.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::NotPersisted`] for an unsaved item, or the
    /// store error.
    pub fn keychain(&self) -> KeychainResult<Keychain> {
        let item = self.require_bound("keychain")?;
        let raw = self.client().copy_keychain(item)?;
        Ok(Keychain::adopt(Arc::clone(self.client()), raw))
    }

    /// Replaces the attribute mapping with the store's current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::NotPersisted`] for an unsaved item, or the
    /// store error.
    pub fn reload(&mut self) -> KeychainResult<&mut Self> {
        let item = self.require_bound("reload")?;
        let output = self.client().copy_matching(&self.queries().refresh(item))?;
        let backing = self.transient(output.backing);
        let Value::Dictionary(snapshot) = output.value else {
            return Err(KeychainError::UnexpectedResult {
                operation: StoreOperation::CopyMatching,
                expected: "attribute dictionary",
            });
        };
        self.absorb(&snapshot);
        drop(backing);
        Ok(self)
    }

    fn create(&self, options: SaveOptions<'_>) -> KeychainResult<StoreOutput> {
        let mut query = self.queries().create(options);
        log::debug!("adding keychain item with {} attributes", self.attributes.len());
        let result = self.client().add(&query);
        query::scrub(&mut query);
        result.inspect_err(|e| log::warn!("adding keychain item failed: {e}"))
    }

    fn update(&self, item: RawRef) -> KeychainResult<StoreOutput> {
        let queries = self.queries();
        let mut payload = queries.new_attributes();
        log::debug!("updating keychain item {item:?}");
        let result = self.client().update(&queries.update_match(item), &payload);
        query::scrub(&mut payload);
        result.inspect_err(|e| log::warn!("updating {item:?} failed: {e}"))?;
        self.client().copy_matching(&queries.refresh(item))
    }

    /// Takes the handle (if still unbound) and the attributes from a store
    /// snapshot. Unmapped keys are skipped.
    fn absorb(&mut self, snapshot: &Dictionary) {
        if !self.handle.is_bound() {
            if let Some(raw) = snapshot.get(keys::VALUE_REF).and_then(Value::as_raw_ref) {
                self.handle.bind(raw, false);
                self.handle.retain_then_own();
            }
        }
        self.attributes = snapshot
            .iter()
            .filter_map(|(key, value)| {
                let attribute = Attribute::from_store_key(key)?;
                attribute.decode(value).map(|value| (attribute, value))
            })
            .collect();
    }

    fn queries(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(
            &self.attributes,
            self.pending_secret.as_ref().map(ExposeSecret::expose_secret),
            self.is_persisted(),
        )
    }

    fn require_bound(&self, operation: &'static str) -> KeychainResult<RawRef> {
        self.handle
            .raw()
            .ok_or(KeychainError::NotPersisted { operation })
    }

    fn client(&self) -> &Arc<dyn StoreClient> {
        self.handle.client()
    }

    /// Owns the transient container of a store result until dropped.
    fn transient(&self, backing: Option<RawRef>) -> Option<Handle> {
        backing.map(|raw| Handle::owned(Arc::clone(self.client()), raw))
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Item");
        out.field("ref", &self.handle.raw());
        match self.get_str(Attribute::Service) {
            Some(service) => out.field("service", &service),
            None => out.field("server", &self.get_str(Attribute::Server)),
        };
        out.field("account", &self.get_str(Attribute::Account))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
