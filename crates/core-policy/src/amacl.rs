//! Access-Manager ACLs
//!
//! An AMACL entry names the access management service(s) responsible for a
//! set of resources. It is consulted only when the local ACL reached no
//! grant, to decide which AMS the engine should delegate to.

use crate::error::{PolicyError, Result};
use crate::{MAX_ACES, MAX_URI_LENGTH};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core_identity::SubjectId;
use serde::{Deserialize, Serialize};

/// One AMACL record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmaclEntry {
    /// Resource path prefixes this record covers
    #[serde(rename = "rsrc")]
    pub resources: Vec<String>,

    /// AMS device ids, in preference order
    #[serde(rename = "amss")]
    pub ams_devices: Vec<SubjectId>,

    /// Provenance only
    #[serde(rename = "ownrs", default)]
    pub owners: Vec<SubjectId>,
}

impl AmaclEntry {
    /// Create an entry with no owners
    #[must_use]
    pub fn new(resources: Vec<String>, ams_devices: Vec<SubjectId>) -> Self {
        Self {
            resources,
            ams_devices,
            owners: Vec::new(),
        }
    }

    /// Structural validation
    ///
    /// # Errors
    ///
    /// `InvalidAmacl` when resources or AMS ids are missing, `UriTooLong`
    /// when a resource exceeds `MAX_URI_LENGTH`.
    pub fn validate(&self) -> Result<()> {
        if self.resources.is_empty() || self.resources.iter().any(String::is_empty) {
            return Err(PolicyError::InvalidAmacl(
                "AMACL must list non-empty resources".to_string(),
            ));
        }
        if let Some(long) = self.resources.iter().find(|r| r.len() > MAX_URI_LENGTH) {
            return Err(PolicyError::UriTooLong {
                max: MAX_URI_LENGTH,
                length: long.len(),
            });
        }
        if self.ams_devices.is_empty() {
            return Err(PolicyError::InvalidAmacl(
                "AMACL must name at least one AMS device".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ordered collection of AMACL records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmaclStore {
    #[serde(rename = "amacl")]
    entries: Vec<AmaclEntry>,
}

impl AmaclStore {
    /// Create an empty store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a store from a list of entries
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or `TooManyAces` if there are
    /// more than `MAX_ACES` entries.
    pub fn from_entries(entries: Vec<AmaclEntry>) -> Result<Self> {
        let mut store = Self::new();
        for entry in entries {
            store.append(entry)?;
        }
        Ok(store)
    }

    /// Append one entry
    ///
    /// # Errors
    ///
    /// `TooManyAces` when full, or a validation error.
    pub fn append(&mut self, entry: AmaclEntry) -> Result<()> {
        if self.entries.len() >= MAX_ACES {
            return Err(PolicyError::TooManyAces {
                max: MAX_ACES,
                attempted: self.entries.len() + 1,
            });
        }
        entry.validate()?;
        self.entries.push(entry);
        Ok(())
    }

    /// AMS device responsible for `resource`
    ///
    /// The first entry with a resource string that is a prefix of
    /// `resource` wins, and its first AMS id is returned.
    #[must_use]
    pub fn ams_device_for(&self, resource: &str) -> Option<SubjectId> {
        self.entries
            .iter()
            .find(|entry| entry.resources.iter().any(|r| resource.starts_with(r.as_str())))
            .and_then(|entry| entry.ams_devices.first().copied())
    }

    /// All entries in insertion order
    #[must_use]
    pub fn entries(&self) -> &[AmaclEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
