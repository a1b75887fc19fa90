use core_policy::PolicyError;
use thiserror::Error;

/// Errors of the `app-utils` crate
#[derive(Error, Debug)]
pub enum Error {
    /// Reading a database file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML document could not be parsed
    #[error("YAML parsing failed: {0}")]
    YamlParseError(String),

    /// JSON document could not be parsed
    #[error("JSON parsing failed: {0}")]
    JsonParseError(String),

    /// Database content violates an ACL limit or invariant
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
