//! Common test utilities shared across integration tests.

use std::sync::Arc;

use keychain_core::store::MemoryStore;
use keychain_core::{Attribute, AttributeValue, Item, ItemClass};

/// Creates a fresh in-memory store.
pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Creates an internet-password item for `account` in `store`.
pub fn internet_password(store: &Arc<MemoryStore>, account: &str) -> Item {
    Item::new(
        store.clone(),
        [
            (Attribute::Class, AttributeValue::from(ItemClass::InternetPassword)),
            (Attribute::Server, AttributeValue::from("git.example.com")),
            (Attribute::Protocol, AttributeValue::from("htps")),
            (Attribute::Port, AttributeValue::from(443_i64)),
            (Attribute::Account, AttributeValue::from(account)),
        ],
    )
    .expect("item")
}
