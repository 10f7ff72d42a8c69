//! Security.framework entry points used by [`SecurityStore`](super::SecurityStore).
//!
//! Reference counting (`CFRetain` / `CFRelease`) comes from
//! `core-foundation-sys`; everything else is declared here.

#![allow(non_snake_case)]

use core_foundation_sys::base::{CFTypeRef, OSStatus};
use core_foundation_sys::dictionary::CFDictionaryRef;

/// `SecKeychainItemRef`.
pub type SecKeychainItemRef = CFTypeRef;

/// `SecKeychainRef`.
pub type SecKeychainRef = CFTypeRef;

#[link(name = "Security", kind = "framework")]
extern "C" {
    pub fn SecItemAdd(attributes: CFDictionaryRef, result: *mut CFTypeRef) -> OSStatus;

    pub fn SecItemUpdate(query: CFDictionaryRef, attributes_to_update: CFDictionaryRef)
        -> OSStatus;

    pub fn SecItemCopyMatching(query: CFDictionaryRef, result: *mut CFTypeRef) -> OSStatus;

    pub fn SecKeychainItemDelete(item: SecKeychainItemRef) -> OSStatus;

    pub fn SecKeychainItemCopyKeychain(
        item: SecKeychainItemRef,
        keychain: *mut SecKeychainRef,
    ) -> OSStatus;
}
