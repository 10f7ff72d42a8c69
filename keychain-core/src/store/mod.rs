//! Credential store client interface.
//!
//! Items never talk to the platform directly; every native call goes through a
//! [`StoreClient`]. Implementations:
//!
//! - [`MemoryStore`]: in-process store for tests and hosts without a keychain
//! - `SecurityStore`: Security.framework on macOS

pub mod memory;

#[cfg(target_os = "macos")]
mod macos;

pub use memory::{MemoryStore, StoreCall};

#[cfg(target_os = "macos")]
pub use macos::SecurityStore;

use crate::error::KeychainResult;
use crate::value::{Dictionary, RawRef, Value};

/// Result of a store call that returns a native object.
///
/// `value` is the decoded result. Native references inside it stay valid only
/// while `backing` (the transient container the store returned) is alive; the
/// caller retains what it keeps and then releases `backing` exactly once.
#[derive(Debug)]
pub struct StoreOutput {
    /// Decoded result.
    pub value: Value,
    /// Transient native object owning `value`, if any.
    pub backing: Option<RawRef>,
}

/// The operations the object model consumes from a credential store.
///
/// Each method maps to one native call; a nonzero native status is reported
/// as [`KeychainError::Store`](crate::KeychainError::Store). Calls may block,
/// e.g. on a user permission prompt.
pub trait StoreClient: Send + Sync {
    /// Adds an item described by `query` (`SecItemAdd`).
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the item.
    fn add(&self, query: &Dictionary) -> KeychainResult<StoreOutput>;

    /// Applies `attributes` to the items identified by `query` (`SecItemUpdate`).
    ///
    /// # Errors
    ///
    /// Returns an error if no item matches or the update is rejected.
    fn update(&self, query: &Dictionary, attributes: &Dictionary) -> KeychainResult<()>;

    /// Looks up items, attributes or data (`SecItemCopyMatching`).
    ///
    /// # Errors
    ///
    /// Returns an error if nothing matches or access is denied.
    fn copy_matching(&self, query: &Dictionary) -> KeychainResult<StoreOutput>;

    /// Deletes an item (`SecKeychainItemDelete`).
    ///
    /// # Errors
    ///
    /// Returns an error if the item no longer exists.
    fn delete(&self, item: RawRef) -> KeychainResult<()>;

    /// Returns the keychain containing `item`, retained for the caller
    /// (`SecKeychainItemCopyKeychain`).
    ///
    /// # Errors
    ///
    /// Returns an error if the item is not in a keychain.
    fn copy_keychain(&self, item: RawRef) -> KeychainResult<RawRef>;

    /// Increments the reference count of a native object (`CFRetain`).
    fn retain(&self, object: RawRef);

    /// Decrements the reference count of a native object (`CFRelease`).
    fn release(&self, object: RawRef);
}
