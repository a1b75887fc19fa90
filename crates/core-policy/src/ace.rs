//! Access Control Entries
//!
//! An ACE binds one subject to a list of resource paths, a granted CRUDN
//! bitmask and an optional set of recurring validity windows.
//!
//! The serialized field names follow the `/oic/sec/acl` record layout:
//! `sub`, `rsrc`, `perms`, `prds`, `recurs`, `ownrs`.

use crate::error::{PolicyError, Result};
use crate::permission::Permission;
use crate::{MAX_PERIODS_PER_ACE, MAX_URI_LENGTH, WILDCARD_RESOURCE_URI};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core_identity::SubjectId;
use serde::{Deserialize, Serialize};

/// One rule of the ACL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    /// Subject this rule applies to (may be the wildcard)
    #[serde(rename = "sub")]
    pub subject: SubjectId,

    /// Resource paths covered, matched verbatim or via `"*"`
    #[serde(rename = "rsrc")]
    pub resources: Vec<String>,

    /// Granted CRUDN bitmask
    #[serde(rename = "perms")]
    pub permission: Permission,

    /// Validity periods, paired index-by-index with `recurrences`
    ///
    /// Empty means the rule is always valid.
    #[serde(rename = "prds", default, skip_serializing_if = "Vec::is_empty")]
    pub periods: Vec<String>,

    /// Recurrence rules, one per period (empty string = period only)
    #[serde(rename = "recurs", default, skip_serializing_if = "Vec::is_empty")]
    pub recurrences: Vec<String>,

    /// Provenance only; never consulted by the decision procedure
    #[serde(rename = "ownrs", default)]
    pub owners: Vec<SubjectId>,
}

impl AccessControlEntry {
    /// Create an always-valid ACE with no owners
    #[must_use]
    pub fn new(subject: SubjectId, resources: Vec<String>, permission: Permission) -> Self {
        Self {
            subject,
            resources,
            permission,
            periods: Vec::new(),
            recurrences: Vec::new(),
            owners: Vec::new(),
        }
    }

    /// Add a period/recurrence pair
    #[must_use]
    pub fn with_window(mut self, period: impl Into<String>, recurrence: impl Into<String>) -> Self {
        self.periods.push(period.into());
        self.recurrences.push(recurrence.into());
        self
    }

    /// Add an owner
    #[must_use]
    pub fn with_owner(mut self, owner: SubjectId) -> Self {
        self.owners.push(owner);
        self
    }

    /// True if `resource` is listed verbatim or the ACE lists the wildcard resource
    #[must_use]
    pub fn resource_matches(&self, resource: &str) -> bool {
        self.resources
            .iter()
            .any(|r| r == resource || r == WILDCARD_RESOURCE_URI)
    }

    /// True if the ACE restricts access to time windows
    #[must_use]
    pub fn has_time_restriction(&self) -> bool {
        !self.periods.is_empty()
    }

    /// Structural validation applied when ACEs are installed
    ///
    /// Mismatched period/recurrence lists are *not* rejected here: they are
    /// accepted and then never match (fail closed) at evaluation time.
    ///
    /// # Errors
    ///
    /// - `PolicyError::InvalidAce` if there are no resources or one is empty
    /// - `PolicyError::UriTooLong` if a resource exceeds `MAX_URI_LENGTH`
    /// - `PolicyError::InvalidAce` if there are more than `MAX_PERIODS_PER_ACE` periods
    pub fn validate(&self) -> Result<()> {
        if self.resources.is_empty() {
            return Err(PolicyError::InvalidAce(
                "ACE must list at least one resource".to_string(),
            ));
        }

        for resource in &self.resources {
            if resource.is_empty() {
                return Err(PolicyError::InvalidAce(
                    "Resource path cannot be empty".to_string(),
                ));
            }
            if resource.len() > MAX_URI_LENGTH {
                return Err(PolicyError::UriTooLong {
                    max: MAX_URI_LENGTH,
                    length: resource.len(),
                });
            }
        }

        if self.periods.len() > MAX_PERIODS_PER_ACE {
            return Err(PolicyError::InvalidAce(alloc::format!(
                "ACE has {} periods (maximum {})",
                self.periods.len(),
                MAX_PERIODS_PER_ACE
            )));
        }

        Ok(())
    }
}
