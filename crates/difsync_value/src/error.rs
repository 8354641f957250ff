//! Error types for the DIF value model.

use thiserror::Error;

/// Result type for value-model operations.
pub type ValueResult<T> = Result<T, ValueError>;

/// Errors that can occur while building or inspecting DIF values.
#[derive(Debug, Error)]
pub enum ValueError {
    /// A pointer address had a width other than 3, 5, or 26 bytes.
    #[error("invalid pointer address length: {len} bytes (expected 3, 5, or 26)")]
    InvalidAddressLength {
        /// The rejected width.
        len: usize,
    },

    /// A pointer address text form was not valid hex.
    #[error("invalid pointer address hex: {message}")]
    InvalidAddressHex {
        /// Description of the parse failure.
        message: String,
    },

    /// A big-integer payload was not a valid decimal string.
    #[error("invalid big-integer payload: {text:?}")]
    InvalidBigInteger {
        /// The rejected payload text.
        text: String,
    },
}

impl ValueError {
    /// Creates an invalid address hex error.
    pub fn invalid_address_hex(message: impl Into<String>) -> Self {
        Self::InvalidAddressHex {
            message: message.into(),
        }
    }

    /// Creates an invalid big-integer error.
    pub fn invalid_big_integer(text: impl Into<String>) -> Self {
        Self::InvalidBigInteger { text: text.into() }
    }
}
