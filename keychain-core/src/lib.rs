//! Object model for credential items stored in the platform keychain.
//!
//! An [`Item`] is a generic or internet password: a set of typed attributes
//! plus a secret that is fetched lazily. Items are created, updated, reloaded
//! and deleted through a [`StoreClient`](store::StoreClient), which is
//! Security.framework on macOS ([`store::SecurityStore`]) or the in-memory
//! [`store::MemoryStore`].
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use keychain_core::store::MemoryStore;
//! use keychain_core::{Attribute, Item};
//! use secrecy::ExposeSecret;
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut item = Item::new(
//!     store.clone(),
//!     [(Attribute::Service, "example.com"), (Attribute::Account, "alice")],
//! )?;
//! item.set_password("s3cret");
//! item.save()?;
//!
//! assert!(item.is_persisted());
//! assert_eq!(item.password()?.expose_secret(), b"s3cret");
//! # Ok::<(), keychain_core::KeychainError>(())
//! ```

mod attributes;
pub use attributes::*;

mod class;
pub use class::*;

mod error;
pub use error::*;

mod handle;
pub use handle::*;

mod item;
pub use item::*;

mod keychain;
pub use keychain::*;

mod query;
pub use query::{QueryBuilder, SaveOptions};

mod value;
pub use value::*;

pub mod keys;

/// Host logging bridge.
pub mod logger;

pub mod store;
