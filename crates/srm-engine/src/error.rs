use crate::engine::EngineState;
use core_identity::IdentityError;
use core_policy::PolicyError;
use thiserror::Error;

/// Errors raised by the engine's plumbing
///
/// Access decisions are never errors. These cover configuration, payload
/// decoding, transport hand-off and misuse of the engine API.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The transport refused to send a request
    #[error("Transport error: {0}")]
    Transport(String),

    /// A payload could not be decoded or encoded
    #[error("Payload error: {0}")]
    Payload(String),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the current state
    #[error("Invalid engine state: expected {expected}, found {found}")]
    InvalidState {
        /// State the operation requires
        expected: EngineState,
        /// State the engine is in
        found: EngineState,
    },

    /// ACL data was rejected
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Identifier could not be decoded
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;
