//! Store-native values exchanged with a [`StoreClient`](crate::store::StoreClient).
//!
//! These mirror the CoreFoundation types the credential store speaks
//! (`CFString`, `CFData`, `CFDate`, `CFBoolean`, `CFNumber`, `CFArray`,
//! `CFDictionary`) plus opaque references to native objects. Conversion to and
//! from the semantic attribute layer lives in [`crate::attributes`].

use std::collections::btree_map::{self, BTreeMap};
use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};

/// Address of a native object owned by the credential store runtime.
///
/// A `RawRef` is never null; an unbound reference is `Option<RawRef>::None`.
/// It carries no ownership by itself, see [`Handle`](crate::handle::Handle).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawRef(NonZeroUsize);

impl RawRef {
    /// Wraps a native pointer, returning `None` for null.
    #[must_use]
    pub fn from_ptr(ptr: *const c_void) -> Option<Self> {
        NonZeroUsize::new(ptr.expose_provenance()).map(Self)
    }

    /// Wraps a non-zero address.
    #[must_use]
    pub const fn from_address(address: NonZeroUsize) -> Self {
        Self(address)
    }

    /// Numeric address of the native object.
    #[must_use]
    pub const fn address(self) -> usize {
        self.0.get()
    }

    /// Native pointer for passing back across the FFI boundary.
    #[must_use]
    pub fn as_ptr(self) -> *const c_void {
        std::ptr::with_exposed_provenance(self.0.get())
    }
}

impl fmt::Debug for RawRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A value as stored in or returned by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// UTF-8 text (`CFString`).
    String(String),
    /// Raw bytes (`CFData`).
    Data(Vec<u8>),
    /// Point in time (`CFDate`).
    Date(DateTime<Utc>),
    /// Boolean (`CFBoolean`).
    Bool(bool),
    /// Integer (`CFNumber`).
    Number(i64),
    /// Opaque reference to a native object.
    Ref(RawRef),
    /// Ordered list (`CFArray`).
    Array(Vec<Value>),
    /// Nested dictionary (`CFDictionary`).
    Dictionary(Dictionary),
}

impl Value {
    /// Returns the text if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the bytes if this is data.
    #[must_use]
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the boolean if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the native reference if this is one.
    #[must_use]
    pub const fn as_raw_ref(&self) -> Option<RawRef> {
        match self {
            Self::Ref(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the nested dictionary if this is one.
    #[must_use]
    pub const fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(v) => Some(v),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Data(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Data(v.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Date(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Number(v)
    }
}

impl From<RawRef> for Value {
    fn from(v: RawRef) -> Self {
        Self::Ref(v)
    }
}

impl From<Vec<Self>> for Value {
    fn from(v: Vec<Self>) -> Self {
        Self::Array(v)
    }
}

impl From<Dictionary> for Value {
    fn from(v: Dictionary) -> Self {
        Self::Dictionary(v)
    }
}

/// A store-native dictionary keyed by store keys (`kSec*` constants).
///
/// Used both for queries sent to the store and for attribute snapshots it
/// returns. Iteration order is by key, which keeps queries deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: BTreeMap<String, Value>,
}

impl Dictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Copies every entry of `other` into `self`, overwriting on conflict.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Dictionary {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
