//! Engine configuration
//!
//! ```toml
//! max_uri_length = 64
//! trusted_clock = true
//! ams_response_timeout_secs = 30
//! ```

use crate::error::{EngineError, Result};
use core_policy::MAX_URI_LENGTH;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime settings of a [`crate::PolicyEngine`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Longest accepted resource path, query excluded
    pub max_uri_length: usize,

    /// False on platforms without a reliable real-time clock
    ///
    /// Time windows are then not enforced at all (degraded trust).
    pub trusted_clock: bool,

    /// Bounded wait for a parked delegation; `None` waits forever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ams_response_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_uri_length: MAX_URI_LENGTH,
            trusted_clock: true,
            ams_response_timeout_secs: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// `EngineError::Config` on syntax errors, unknown keys or invalid values.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| EngineError::Config(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// `EngineError::Config` if `max_uri_length` is 0 or above
    /// `MAX_URI_LENGTH`, or if the timeout is 0.
    pub fn validate(&self) -> Result<()> {
        if self.max_uri_length == 0 || self.max_uri_length > MAX_URI_LENGTH {
            return Err(EngineError::Config(format!(
                "max_uri_length must be between 1 and {} (got {})",
                MAX_URI_LENGTH, self.max_uri_length
            )));
        }
        if self.ams_response_timeout_secs == Some(0) {
            return Err(EngineError::Config(
                "ams_response_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Delegation timeout as a duration
    #[must_use]
    pub fn ams_response_timeout(&self) -> Option<Duration> {
        self.ams_response_timeout_secs.map(Duration::from_secs)
    }
}
