//! Error types for the synchronization layer.

use difsync_value::{PointerAddress, ValueError};
use thiserror::Error;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the synchronization layer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A host value has no conversion rule.
    #[error("unsupported host value: {message}")]
    UnsupportedType {
        /// Description of the rejected value.
        message: String,
    },

    /// A DIF value carries a type address with no registered binding.
    #[error("no type binding registered for type {address}")]
    CustomTypeNotSupported {
        /// The unregistered type address.
        address: PointerAddress,
    },

    /// An update was delivered for an address with no bound local mirror.
    #[error("no bound mirror for address {address}")]
    UnknownTypeBinding {
        /// The address the update targeted.
        address: PointerAddress,
    },

    /// An update carried a key kind the target mirror cannot handle.
    #[error("invalid update key: expected {expected}, got {found}")]
    InvalidUpdateKey {
        /// The key kind the mirror expects.
        expected: String,
        /// The key kind the update carried.
        found: String,
    },

    /// A synchronous entry point received a pending result from the engine.
    #[error("synchronous resolution unavailable: the engine returned a pending result")]
    SyncResolutionUnavailable,

    /// Unregister was called with an unknown or already-removed handle.
    #[error("observer {handle} not found")]
    ObserverNotFound {
        /// The rejected handle.
        handle: u64,
    },

    /// An observe or mutate attempt against an immutable reference.
    #[error("reference {address} is immutable")]
    ImmutableReferenceViolation {
        /// The immutable reference's address.
        address: PointerAddress,
    },

    /// Value-model error.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Engine-reported failure.
    #[error("engine error: {message}")]
    Engine {
        /// Description from the engine.
        message: String,
    },
}

impl SyncError {
    /// Creates an unsupported type error.
    pub fn unsupported_type(message: impl Into<String>) -> Self {
        Self::UnsupportedType {
            message: message.into(),
        }
    }

    /// Creates an invalid update key error.
    pub fn invalid_update_key(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::InvalidUpdateKey {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates an engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::SyncResolutionUnavailable;
        assert!(err.to_string().contains("pending"));

        let err = SyncError::ObserverNotFound { handle: 7 };
        assert!(err.to_string().contains('7'));

        let err = SyncError::invalid_update_key("index key", "text key");
        assert!(err.to_string().contains("index key"));
        assert!(err.to_string().contains("text key"));
    }

    #[test]
    fn value_error_conversion() {
        let value_err = ValueError::InvalidAddressLength { len: 4 };
        let err: SyncError = value_err.into();
        assert!(matches!(err, SyncError::Value(_)));
    }
}
