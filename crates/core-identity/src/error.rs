use alloc::string::String;
use thiserror::Error;

/// Errors produced while building or decoding subject identifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Raw bytes of the wrong length
    #[error("Invalid identifier length: {length} bytes")]
    InvalidLength {
        /// Length that was supplied
        length: usize,
    },

    /// Text that is not valid base64
    #[error("Invalid base64 identifier: {0}")]
    InvalidEncoding(String),

    /// Text that is neither `*`, a UUID nor base64
    #[error("Invalid identifier: {0}")]
    InvalidFormat(String),
}

/// Specific Result type for identity operations
pub type Result<T> = core::result::Result<T, IdentityError>;
