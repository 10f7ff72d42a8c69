//! In-memory credential store.
//!
//! These implementations are NOT secure for production use: secrets live in
//! plain process memory. The store is meant for unit and integration tests of
//! the item engine and for hosts that have no platform keychain.
//!
//! Besides item records it models the native object table: every reference
//! handed out is reference counted, so tests can check that items retain and
//! release exactly what they own.

// Allow certain clippy lints for test-support code
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::{StoreClient, StoreOutput};
use crate::attributes::Attribute;
use crate::class::ItemClass;
use crate::error::{KeychainResult, Status, StoreOperation};
use crate::keys;
use crate::value::{Dictionary, RawRef, Value};

/// First address handed out; keeps fake references looking like pointers.
const FIRST_ADDRESS: NonZeroUsize = NonZeroUsize::MIN.saturating_add(0x0fff);

/// Distance between consecutive fake addresses.
const ADDRESS_STEP: usize = 0x10;

/// A recorded call made against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    /// Which operation was invoked.
    pub operation: StoreOperation,
    /// The query (or match query) passed in.
    pub query: Option<Dictionary>,
    /// The new-attributes payload of an update.
    pub attributes: Option<Dictionary>,
    /// The item reference of a delete or keychain lookup.
    pub item: Option<RawRef>,
}

impl StoreCall {
    const fn new(operation: StoreOperation) -> Self {
        Self {
            operation,
            query: None,
            attributes: None,
            item: None,
        }
    }
}

#[derive(Debug)]
enum ObjectKind {
    /// Reference to an item record.
    Item(u64),
    /// A keychain container.
    Keychain,
    /// Transient result container; holds one count on each contained ref.
    Result(Vec<RawRef>),
}

#[derive(Debug)]
struct Object {
    kind: ObjectKind,
    count: usize,
}

#[derive(Debug)]
struct Record {
    class: ItemClass,
    keychain: RawRef,
    attributes: Dictionary,
    data: Vec<u8>,
    /// Live reference object for this record, if one is currently allocated.
    live_ref: Option<RawRef>,
}

#[derive(Debug)]
struct Inner {
    next_address: NonZeroUsize,
    next_record: u64,
    objects: HashMap<RawRef, Object>,
    records: BTreeMap<u64, Record>,
    default_keychain: RawRef,
    calls: Vec<StoreCall>,
    failures: HashMap<StoreOperation, Status>,
    invalid_releases: usize,
}

impl Inner {
    fn new() -> Self {
        let default_keychain = RawRef::from_address(FIRST_ADDRESS);
        let mut objects = HashMap::new();
        // The store itself holds the only count on its keychains.
        objects.insert(
            default_keychain,
            Object {
                kind: ObjectKind::Keychain,
                count: 1,
            },
        );
        Self {
            next_address: FIRST_ADDRESS.saturating_add(ADDRESS_STEP),
            next_record: 1,
            objects,
            records: BTreeMap::new(),
            default_keychain,
            calls: Vec::new(),
            failures: HashMap::new(),
            invalid_releases: 0,
        }
    }

    fn allocate(&mut self, kind: ObjectKind) -> RawRef {
        let raw = RawRef::from_address(self.next_address);
        self.next_address = self.next_address.saturating_add(ADDRESS_STEP);
        self.objects.insert(raw, Object { kind, count: 1 });
        raw
    }

    fn take_failure(&mut self, operation: StoreOperation) -> KeychainResult<()> {
        match self.failures.remove(&operation) {
            Some(status) => status.check(operation),
            None => Ok(()),
        }
    }

    fn retain_object(&mut self, raw: RawRef) {
        match self.objects.get_mut(&raw) {
            Some(object) => object.count += 1,
            None => log::warn!("retain of unknown object {raw:?}"),
        }
    }

    fn release_object(&mut self, raw: RawRef) {
        let Some(object) = self.objects.get_mut(&raw) else {
            log::warn!("release of unknown object {raw:?}");
            self.invalid_releases += 1;
            return;
        };
        object.count -= 1;
        if object.count > 0 {
            return;
        }
        let Some(object) = self.objects.remove(&raw) else {
            return;
        };
        match object.kind {
            ObjectKind::Item(id) => {
                if let Some(record) = self.records.get_mut(&id) {
                    if record.live_ref == Some(raw) {
                        record.live_ref = None;
                    }
                }
            }
            ObjectKind::Result(contained) => {
                for inner in contained {
                    self.release_object(inner);
                }
            }
            ObjectKind::Keychain => {}
        }
    }

    fn resolve_item(&self, raw: RawRef) -> Result<u64, Status> {
        match self.objects.get(&raw).map(|object| &object.kind) {
            Some(ObjectKind::Item(id)) if self.records.contains_key(id) => Ok(*id),
            Some(ObjectKind::Item(_)) => Err(Status::ITEM_NOT_FOUND),
            Some(_) => Err(Status::PARAM),
            None => Err(Status::INVALID_ITEM_REF),
        }
    }

    fn resolve_keychain(&self, value: &Value) -> Result<RawRef, Status> {
        let raw = value.as_raw_ref().ok_or(Status::PARAM)?;
        match self.objects.get(&raw).map(|object| &object.kind) {
            Some(ObjectKind::Keychain) => Ok(raw),
            _ => Err(Status::NO_SUCH_KEYCHAIN),
        }
    }

    fn is_duplicate(
        &self,
        class: ItemClass,
        keychain: RawRef,
        attributes: &Dictionary,
        except: Option<u64>,
    ) -> bool {
        self.records.iter().any(|(id, record)| {
            Some(*id) != except
                && record.class == class
                && record.keychain == keychain
                && class
                    .primary_key()
                    .iter()
                    .all(|key| record.attributes.get(key) == attributes.get(key))
        })
    }

    /// Records matching `query`, either by explicit item list or by attributes.
    fn matching(&self, query: &Dictionary) -> Result<Vec<u64>, Status> {
        let class = match query.get(keys::CLASS) {
            Some(value) => Some(
                value
                    .as_str()
                    .and_then(ItemClass::from_store_tag)
                    .ok_or(Status::PARAM)?,
            ),
            None => None,
        };

        let candidates: Vec<u64> = match query.get(keys::MATCH_ITEM_LIST) {
            Some(Value::Array(list)) => list
                .iter()
                .map(|value| {
                    value
                        .as_raw_ref()
                        .ok_or(Status::PARAM)
                        .and_then(|raw| self.resolve_item(raw))
                })
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(Status::PARAM),
            None => self
                .records
                .iter()
                .filter(|(_, record)| {
                    query
                        .iter()
                        .filter(|(key, _)| {
                            key.as_str() != keys::CLASS
                                && Attribute::from_store_key(key).is_some()
                        })
                        .all(|(key, value)| record.attributes.get(key) == Some(value))
                })
                .map(|(id, _)| *id)
                .collect(),
        };

        let matched: Vec<u64> = candidates
            .into_iter()
            .filter(|id| {
                self.records
                    .get(id)
                    .is_some_and(|record| class.is_none_or(|class| record.class == class))
            })
            .collect();
        if matched.is_empty() {
            Err(Status::ITEM_NOT_FOUND)
        } else {
            Ok(matched)
        }
    }

    /// Returns a reference to record `id`, counted once for the caller.
    fn item_ref(&mut self, id: u64) -> RawRef {
        let live = self.records.get(&id).and_then(|record| record.live_ref);
        if let Some(raw) = live {
            self.retain_object(raw);
            return raw;
        }
        let raw = self.allocate(ObjectKind::Item(id));
        if let Some(record) = self.records.get_mut(&id) {
            record.live_ref = Some(raw);
        }
        raw
    }

    /// Builds the result for record `id` according to the `r_*` flags.
    fn output(&mut self, id: u64, query: &Dictionary) -> StoreOutput {
        let flag = |key: &str| query.get(key).and_then(Value::as_bool).unwrap_or(false);
        let want_attributes = flag(keys::RETURN_ATTRIBUTES);
        let want_ref = flag(keys::RETURN_REF);
        let want_data = flag(keys::RETURN_DATA);

        let (attributes, data) = self
            .records
            .get(&id)
            .map(|record| (record.attributes.clone(), record.data.clone()))
            .unwrap_or_default();

        let mut contained = Vec::new();
        let value = if want_attributes || (want_ref && want_data) {
            let mut dict = attributes;
            if want_data {
                dict.insert(keys::VALUE_DATA, data);
            }
            if want_ref {
                let raw = self.item_ref(id);
                contained.push(raw);
                dict.insert(keys::VALUE_REF, raw);
            }
            Value::Dictionary(dict)
        } else if want_ref {
            let raw = self.item_ref(id);
            contained.push(raw);
            Value::Ref(raw)
        } else if want_data {
            Value::Data(data)
        } else {
            Value::Dictionary(Dictionary::new())
        };

        let backing = self.allocate(ObjectKind::Result(contained));
        StoreOutput {
            value,
            backing: Some(backing),
        }
    }

    fn insert(&mut self, query: &Dictionary) -> Result<StoreOutput, Status> {
        let class = query
            .get(keys::CLASS)
            .and_then(Value::as_str)
            .and_then(ItemClass::from_store_tag)
            .ok_or(Status::PARAM)?;
        let keychain = match query.get(keys::USE_KEYCHAIN) {
            Some(value) => self.resolve_keychain(value)?,
            None => self.default_keychain,
        };

        let mut attributes: Dictionary = query
            .iter()
            .filter(|(key, _)| {
                Attribute::from_store_key(key).is_some_and(|attr| !attr.is_read_only())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if self.is_duplicate(class, keychain, &attributes, None) {
            return Err(Status::DUPLICATE_ITEM);
        }

        let now = Utc::now();
        attributes.insert(keys::ATTR_CREATION_DATE, now);
        attributes.insert(keys::ATTR_MODIFICATION_DATE, now);
        let data = query
            .get(keys::VALUE_DATA)
            .and_then(Value::as_data)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        let id = self.next_record;
        self.next_record += 1;
        self.records.insert(
            id,
            Record {
                class,
                keychain,
                attributes,
                data,
                live_ref: None,
            },
        );
        Ok(self.output(id, query))
    }

    fn modify(&mut self, query: &Dictionary, changes: &Dictionary) -> Result<(), Status> {
        if changes.contains_key(keys::CLASS) {
            return Err(Status::PARAM);
        }
        let ids = self.matching(query)?;

        let mut staged = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(record) = self.records.get(&id) else {
                continue;
            };
            let mut attributes = record.attributes.clone();
            for (key, value) in changes {
                if Attribute::from_store_key(key).is_some_and(|attr| !attr.is_read_only()) {
                    attributes.insert(key.clone(), value.clone());
                }
            }
            if self.is_duplicate(record.class, record.keychain, &attributes, Some(id)) {
                return Err(Status::DUPLICATE_ITEM);
            }
            staged.push((id, attributes));
        }

        let data = changes.get(keys::VALUE_DATA).and_then(Value::as_data);
        let now = Utc::now();
        for (id, mut attributes) in staged {
            attributes.insert(keys::ATTR_MODIFICATION_DATE, now);
            if let Some(record) = self.records.get_mut(&id) {
                record.attributes = attributes;
                if let Some(data) = data {
                    record.data = data.to_vec();
                }
            }
        }
        Ok(())
    }
}

/// In-memory [`StoreClient`].
///
/// Thread-safe; all state sits behind one mutex.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store with a default keychain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Keychain that receives items added without an explicit target.
    #[must_use]
    pub fn default_keychain(&self) -> RawRef {
        self.lock().default_keychain
    }

    /// Creates an additional keychain owned by the store.
    #[must_use]
    pub fn create_keychain(&self) -> RawRef {
        self.lock().allocate(ObjectKind::Keychain)
    }

    /// Makes the next call of `operation` fail with `status`.
    pub fn fail_next(&self, operation: StoreOperation, status: Status) {
        self.lock().failures.insert(operation, status);
    }

    /// All calls made so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Current reference count of a native object; `0` once it is freed.
    #[must_use]
    pub fn retain_count(&self, object: RawRef) -> usize {
        self.lock()
            .objects
            .get(&object)
            .map_or(0, |object| object.count)
    }

    /// Number of native objects currently alive, keychains included.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.lock().objects.len()
    }

    /// Releases of objects that were already freed or never existed.
    #[must_use]
    pub fn invalid_releases(&self) -> usize {
        self.lock().invalid_releases
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Returns `true` if no items are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreClient for MemoryStore {
    fn add(&self, query: &Dictionary) -> KeychainResult<StoreOutput> {
        let operation = StoreOperation::Add;
        let mut inner = self.lock();
        inner.calls.push(StoreCall {
            query: Some(query.clone()),
            ..StoreCall::new(operation)
        });
        inner.take_failure(operation)?;
        inner.insert(query).map_err(|status| status.into_error(operation))
    }

    fn update(&self, query: &Dictionary, attributes: &Dictionary) -> KeychainResult<()> {
        let operation = StoreOperation::Update;
        let mut inner = self.lock();
        inner.calls.push(StoreCall {
            query: Some(query.clone()),
            attributes: Some(attributes.clone()),
            ..StoreCall::new(operation)
        });
        inner.take_failure(operation)?;
        inner
            .modify(query, attributes)
            .map_err(|status| status.into_error(operation))
    }

    fn copy_matching(&self, query: &Dictionary) -> KeychainResult<StoreOutput> {
        let operation = StoreOperation::CopyMatching;
        let mut inner = self.lock();
        inner.calls.push(StoreCall {
            query: Some(query.clone()),
            ..StoreCall::new(operation)
        });
        inner.take_failure(operation)?;
        let ids = inner
            .matching(query)
            .map_err(|status| status.into_error(operation))?;
        match ids.first() {
            Some(id) => Ok(inner.output(*id, query)),
            None => Err(Status::ITEM_NOT_FOUND.into_error(operation)),
        }
    }

    fn delete(&self, item: RawRef) -> KeychainResult<()> {
        let operation = StoreOperation::Delete;
        let mut inner = self.lock();
        inner.calls.push(StoreCall {
            item: Some(item),
            ..StoreCall::new(operation)
        });
        inner.take_failure(operation)?;
        let id = inner
            .resolve_item(item)
            .map_err(|status| status.into_error(operation))?;
        inner.records.remove(&id);
        Ok(())
    }

    fn copy_keychain(&self, item: RawRef) -> KeychainResult<RawRef> {
        let operation = StoreOperation::CopyKeychain;
        let mut inner = self.lock();
        inner.calls.push(StoreCall {
            item: Some(item),
            ..StoreCall::new(operation)
        });
        inner.take_failure(operation)?;
        let id = inner
            .resolve_item(item)
            .map_err(|status| status.into_error(operation))?;
        let keychain = inner
            .records
            .get(&id)
            .map(|record| record.keychain)
            .ok_or_else(|| Status::ITEM_NOT_FOUND.into_error(operation))?;
        inner.retain_object(keychain);
        Ok(keychain)
    }

    fn retain(&self, object: RawRef) {
        self.lock().retain_object(object);
    }

    fn release(&self, object: RawRef) {
        self.lock().release_object(object);
    }
}
