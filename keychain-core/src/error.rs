//! Error types for credential-store operations.

use std::fmt;

use thiserror::Error;

/// Native status code returned by the credential store. Zero means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    /// The call completed successfully.
    pub const SUCCESS: Self = Self(0);
    /// The function or operation is not implemented.
    pub const UNIMPLEMENTED: Self = Self(-4);
    /// One or more parameters passed to the function were not valid.
    pub const PARAM: Self = Self(-50);
    /// The user canceled the operation.
    pub const USER_CANCELED: Self = Self(-128);
    /// The user name or passphrase was not correct.
    pub const AUTH_FAILED: Self = Self(-25293);
    /// The specified keychain could not be found.
    pub const NO_SUCH_KEYCHAIN: Self = Self(-25294);
    /// The specified item already exists in the keychain.
    pub const DUPLICATE_ITEM: Self = Self(-25299);
    /// The specified item could not be found in the keychain.
    pub const ITEM_NOT_FOUND: Self = Self(-25300);
    /// The specified item is no longer valid.
    pub const INVALID_ITEM_REF: Self = Self(-25304);
    /// User interaction is not allowed.
    pub const INTERACTION_NOT_ALLOWED: Self = Self(-25308);

    const DESCRIPTIONS: &'static [(Self, &'static str)] = &[
        (Self::UNIMPLEMENTED, "function or operation not implemented"),
        (Self::PARAM, "one or more parameters were not valid"),
        (Self::USER_CANCELED, "user canceled the operation"),
        (Self::AUTH_FAILED, "user name or passphrase was not correct"),
        (Self::NO_SUCH_KEYCHAIN, "the specified keychain could not be found"),
        (Self::DUPLICATE_ITEM, "the specified item already exists"),
        (Self::ITEM_NOT_FOUND, "the specified item could not be found"),
        (Self::INVALID_ITEM_REF, "the specified item is no longer valid"),
        (Self::INTERACTION_NOT_ALLOWED, "user interaction is not allowed"),
    ];

    /// Returns `true` for the zero status.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Human-readable description for well-known codes.
    #[must_use]
    pub fn description(self) -> Option<&'static str> {
        Self::DESCRIPTIONS
            .iter()
            .find(|(status, _)| *status == self)
            .map(|(_, text)| *text)
    }

    /// Converts the status of a `operation` call into a result.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::Store`] for any nonzero status.
    pub fn check(self, operation: StoreOperation) -> KeychainResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            log::debug!("{operation} returned status {}", self.0);
            Err(self.into_error(operation))
        }
    }

    /// Wraps this status as the error of a failed `operation` call.
    #[must_use]
    pub const fn into_error(self, operation: StoreOperation) -> KeychainError {
        KeychainError::Store {
            operation,
            status: self,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => write!(f, "{} ({text})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// The credential-store call that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StoreOperation {
    /// Adding a new item.
    Add,
    /// Updating the attributes of an existing item.
    Update,
    /// Looking up items, attributes or secret data.
    CopyMatching,
    /// Deleting an item.
    Delete,
    /// Looking up the keychain that owns an item.
    CopyKeychain,
}

/// Errors raised by the keychain object model.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// A credential-store call returned a nonzero status.
    #[error("{operation} failed with status {status}")]
    Store {
        /// The failing call.
        operation: StoreOperation,
        /// Native status code.
        status: Status,
    },

    /// A field name given as text is not a known attribute.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A value of the wrong kind was supplied for a field.
    #[error("invalid value for {field}: expected {expected}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Accepted value kinds.
        expected: &'static str,
    },

    /// The operation needs an item that exists in the store.
    #[error("{operation} requires a persisted item")]
    NotPersisted {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// The store returned a result of an unexpected shape.
    #[error("unexpected result from {operation}: expected {expected}")]
    UnexpectedResult {
        /// The call whose result was rejected.
        operation: StoreOperation,
        /// What the caller was looking for.
        expected: &'static str,
    },
}

impl KeychainError {
    /// Native status of a failed store call, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::Store { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` when the store rejected an add because the item already exists.
    #[must_use]
    pub fn is_duplicate_item(&self) -> bool {
        self.status() == Some(Status::DUPLICATE_ITEM)
    }

    /// `true` when the store could not find the item.
    #[must_use]
    pub fn is_item_not_found(&self) -> bool {
        self.status() == Some(Status::ITEM_NOT_FOUND)
    }

    /// `true` when the user dismissed an access prompt.
    #[must_use]
    pub fn is_user_canceled(&self) -> bool {
        self.status() == Some(Status::USER_CANCELED)
    }
}

/// Result type for keychain operations.
pub type KeychainResult<T> = Result<T, KeychainError>;
