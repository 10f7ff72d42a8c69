//! Security.framework store client.

mod convert;
mod ffi;

use std::ptr;

use core_foundation::base::TCFType;
use core_foundation_sys::base::{CFRelease, CFRetain, CFTypeRef};

use super::{StoreClient, StoreOutput};
use crate::error::{KeychainError, KeychainResult, Status, StoreOperation};
use crate::value::{Dictionary, RawRef, Value};

/// [`StoreClient`] backed by the macOS keychain services.
///
/// Calls may block while the system asks the user for permission.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityStore;

impl SecurityStore {
    /// Creates a client for the user's keychains.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Wraps a result returned under the create rule. The caller owns `result`
/// and releases it through the `backing` reference.
///
/// # Safety
///
/// `result` must be null or a valid object counted for the caller.
unsafe fn output(result: CFTypeRef, operation: StoreOperation) -> StoreOutput {
    let value = unsafe { convert::from_cf(result) }.unwrap_or_else(|| {
        if !result.is_null() {
            log::warn!("{operation} returned an object that could not be decoded");
        }
        Value::Dictionary(Dictionary::new())
    });
    StoreOutput {
        value,
        backing: RawRef::from_ptr(result),
    }
}

impl StoreClient for SecurityStore {
    fn add(&self, query: &Dictionary) -> KeychainResult<StoreOutput> {
        let query = convert::dictionary_to_cf(query);
        let mut result: CFTypeRef = ptr::null();
        // SAFETY: `query` is a valid dictionary for the duration of the call.
        let status = unsafe { ffi::SecItemAdd(query.as_concrete_TypeRef(), &mut result) };
        Status(status).check(StoreOperation::Add)?;
        Ok(unsafe { output(result, StoreOperation::Add) })
    }

    fn update(&self, query: &Dictionary, attributes: &Dictionary) -> KeychainResult<()> {
        let query = convert::dictionary_to_cf(query);
        let attributes = convert::dictionary_to_cf(attributes);
        let status = unsafe {
            ffi::SecItemUpdate(query.as_concrete_TypeRef(), attributes.as_concrete_TypeRef())
        };
        Status(status).check(StoreOperation::Update)
    }

    fn copy_matching(&self, query: &Dictionary) -> KeychainResult<StoreOutput> {
        let query = convert::dictionary_to_cf(query);
        let mut result: CFTypeRef = ptr::null();
        let status = unsafe { ffi::SecItemCopyMatching(query.as_concrete_TypeRef(), &mut result) };
        Status(status).check(StoreOperation::CopyMatching)?;
        Ok(unsafe { output(result, StoreOperation::CopyMatching) })
    }

    fn delete(&self, item: RawRef) -> KeychainResult<()> {
        let status = unsafe { ffi::SecKeychainItemDelete(item.as_ptr()) };
        Status(status).check(StoreOperation::Delete)
    }

    fn copy_keychain(&self, item: RawRef) -> KeychainResult<RawRef> {
        let mut keychain: ffi::SecKeychainRef = ptr::null();
        let status = unsafe { ffi::SecKeychainItemCopyKeychain(item.as_ptr(), &mut keychain) };
        Status(status).check(StoreOperation::CopyKeychain)?;
        RawRef::from_ptr(keychain).ok_or(KeychainError::UnexpectedResult {
            operation: StoreOperation::CopyKeychain,
            expected: "keychain reference",
        })
    }

    fn retain(&self, object: RawRef) {
        unsafe { CFRetain(object.as_ptr()) };
    }

    fn release(&self, object: RawRef) {
        unsafe { CFRelease(object.as_ptr()) };
    }
}
