//! Owned or borrowed reference to a native object.

use std::fmt;
use std::sync::Arc;

use crate::store::StoreClient;
use crate::value::RawRef;

/// A native object reference with explicit ownership.
///
/// A handle is either unbound (the item is not in the store yet) or bound to
/// exactly one native object. When it owns its object it releases it exactly
/// once, on [`release`](Self::release) or on drop, through the client that
/// produced it.
pub struct Handle {
    raw: Option<RawRef>,
    owned: bool,
    client: Arc<dyn StoreClient>,
}

impl Handle {
    /// Creates an unbound handle.
    #[must_use]
    pub fn unbound(client: Arc<dyn StoreClient>) -> Self {
        Self {
            raw: None,
            owned: false,
            client,
        }
    }

    /// Creates a handle bound to `raw` without taking ownership of it.
    #[must_use]
    pub fn borrowed(client: Arc<dyn StoreClient>, raw: RawRef) -> Self {
        Self {
            raw: Some(raw),
            owned: false,
            client,
        }
    }

    /// Creates a handle that takes over a reference already counted for the
    /// caller (e.g. one returned by a `Copy` call).
    #[must_use]
    pub fn owned(client: Arc<dyn StoreClient>, raw: RawRef) -> Self {
        Self {
            raw: Some(raw),
            owned: true,
            client,
        }
    }

    /// Binds the handle to `raw`, releasing any object it owned before.
    pub fn bind(&mut self, raw: RawRef, take_ownership: bool) {
        self.release();
        self.raw = Some(raw);
        self.owned = take_ownership;
    }

    /// Retains the bound object and marks it for release.
    ///
    /// Used for references received without a transfer of ownership that must
    /// outlive the call that produced them. Does nothing if the handle is
    /// unbound or already owns its object.
    pub fn retain_then_own(&mut self) {
        if let (Some(raw), false) = (self.raw, self.owned) {
            self.client.retain(raw);
            self.owned = true;
        }
    }

    /// Releases the bound object if owned. The handle stays bound but no
    /// longer owns anything, so a second call is a no-op.
    pub fn release(&mut self) {
        if let (Some(raw), true) = (self.raw, self.owned) {
            self.client.release(raw);
            self.owned = false;
        }
    }

    /// Releases the object if owned and returns the handle to unbound.
    pub fn unbind(&mut self) {
        self.release();
        self.raw = None;
    }

    /// Returns `true` if bound to a native object.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.raw.is_some()
    }

    /// Returns `true` if the object is released when the handle goes away.
    #[must_use]
    pub const fn is_owned(&self) -> bool {
        self.owned
    }

    /// The bound reference, if any.
    #[must_use]
    pub const fn raw(&self) -> Option<RawRef> {
        self.raw
    }

    /// Client used for reference counting and store calls.
    #[must_use]
    pub const fn client(&self) -> &Arc<dyn StoreClient> {
        &self.client
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("raw", &self.raw)
            .field("owned", &self.owned)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, RawRef) {
        let store = Arc::new(MemoryStore::new());
        let object = store.create_keychain();
        (store, object)
    }

    #[test]
    fn test_unbound_handle_never_releases() {
        let (store, _) = setup();
        let mut handle = Handle::unbound(store.clone());
        handle.retain_then_own();
        handle.release();
        assert!(!handle.is_bound());
        assert!(!handle.is_owned());
        drop(handle);
        assert_eq!(store.invalid_releases(), 0);
    }

    #[test]
    fn test_borrowed_handle_leaves_count_alone() {
        let (store, object) = setup();
        drop(Handle::borrowed(store.clone(), object));
        assert_eq!(store.retain_count(object), 1);
    }

    #[test]
    fn test_retain_then_own_releases_once() {
        let (store, object) = setup();
        let mut handle = Handle::borrowed(store.clone(), object);
        handle.retain_then_own();
        handle.retain_then_own();
        assert_eq!(store.retain_count(object), 2);

        handle.release();
        handle.release();
        assert_eq!(store.retain_count(object), 1);
        drop(handle);
        assert_eq!(store.retain_count(object), 1);
        assert_eq!(store.invalid_releases(), 0);
    }

    #[test]
    fn test_owned_handle_releases_on_drop() {
        let (store, object) = setup();
        store.retain(object);
        drop(Handle::owned(store.clone(), object));
        assert_eq!(store.retain_count(object), 1);
    }

    #[test]
    fn test_rebinding_releases_previous_object() {
        let (store, first) = setup();
        let second = store.create_keychain();
        store.retain(first);

        let mut handle = Handle::owned(store.clone(), first);
        handle.bind(second, false);
        assert_eq!(store.retain_count(first), 1);
        assert_eq!(handle.raw(), Some(second));
        assert!(!handle.is_owned());
    }

    #[test]
    fn test_unbind_releases_and_clears() {
        let (store, object) = setup();
        store.retain(object);
        let mut handle = Handle::owned(store.clone(), object);
        handle.unbind();
        assert!(!handle.is_bound());
        assert_eq!(store.retain_count(object), 1);
    }
}
