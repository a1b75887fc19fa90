//! Error types for core-policy

use alloc::string::String;
use core::fmt;

/// Result type alias for policy operations
pub type Result<T> = core::result::Result<T, PolicyError>;

/// Errors that can occur while building, storing or evaluating ACL data
///
/// These are configuration and data errors. Access *decisions* are never
/// errors; see [`crate::Decision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// ACE is structurally invalid
    InvalidAce(String),

    /// AMACL entry is structurally invalid
    InvalidAmacl(String),

    /// Period string is malformed
    InvalidPeriod(String),

    /// Recurrence rule is malformed
    InvalidRecurrence(String),

    /// ACE carries periods and recurrences of different lengths
    MismatchedPeriods {
        /// Number of periods
        periods: usize,
        /// Number of recurrences
        recurrences: usize,
    },

    /// Serialization error
    SerializationError(String),

    // ===== DoS Prevention Errors =====

    /// Store exceeds maximum allowed entries
    TooManyAces {
        /// Maximum allowed entries
        max: usize,
        /// Attempted number of entries
        attempted: usize,
    },

    /// Resource path exceeds maximum length
    UriTooLong {
        /// Maximum allowed length
        max: usize,
        /// Actual length
        length: usize,
    },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAce(msg) => write!(f, "Invalid ACE: {}", msg),
            Self::InvalidAmacl(msg) => write!(f, "Invalid AMACL: {}", msg),
            Self::InvalidPeriod(msg) => write!(f, "Invalid period: {}", msg),
            Self::InvalidRecurrence(msg) => write!(f, "Invalid recurrence rule: {}", msg),
            Self::MismatchedPeriods {
                periods,
                recurrences,
            } => write!(
                f,
                "ACE has {} periods but {} recurrences",
                periods, recurrences
            ),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Self::TooManyAces { max, attempted } => write!(
                f,
                "ACL exceeds maximum {} entries (attempted: {})",
                max, attempted
            ),
            Self::UriTooLong { max, length } => write!(
                f,
                "Resource URI exceeds maximum {} characters (length: {})",
                max, length
            ),
        }
    }
}

impl core::error::Error for PolicyError {}
