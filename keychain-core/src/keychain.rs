//! Keychain containers.

use std::fmt;
use std::sync::Arc;

use crate::handle::Handle;
use crate::store::StoreClient;
use crate::value::RawRef;

/// A keychain, the container that owns credential items.
///
/// Returned by [`Item::keychain`](crate::Item::keychain) and accepted as a
/// save target through [`SaveOptions`](crate::SaveOptions).
pub struct Keychain {
    handle: Handle,
}

impl Keychain {
    /// Wraps a keychain reference without taking ownership of it.
    #[must_use]
    pub fn from_raw(client: Arc<dyn StoreClient>, raw: RawRef) -> Self {
        Self {
            handle: Handle::borrowed(client, raw),
        }
    }

    /// Wraps a keychain reference counted for the caller; it is released when
    /// the `Keychain` is dropped.
    #[must_use]
    pub fn adopt(client: Arc<dyn StoreClient>, raw: RawRef) -> Self {
        Self {
            handle: Handle::owned(client, raw),
        }
    }

    /// Native reference of the keychain. Always set: a `Keychain` is bound
    /// from construction.
    #[must_use]
    pub const fn raw(&self) -> Option<RawRef> {
        self.handle.raw()
    }

    /// Returns `true` if dropping this value releases the keychain.
    #[must_use]
    pub const fn is_owned(&self) -> bool {
        self.handle.is_owned()
    }
}

impl PartialEq for Keychain {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

impl fmt::Debug for Keychain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw() {
            Some(raw) => write!(f, "Keychain({raw:?})"),
            None => f.write_str("Keychain"),
        }
    }
}
