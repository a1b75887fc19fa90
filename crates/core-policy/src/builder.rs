//! Builder pattern for ergonomic ACL construction

use crate::ace::AccessControlEntry;
use crate::acl::AclStore;
use crate::error::{PolicyError, Result};
use crate::permission::Permission;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core_identity::{SubjectId, WILDCARD_SUBJECT_ID};

/// Builder for creating `AccessControlEntry` instances with a fluent API
///
/// # Examples
///
/// ```
/// use core_policy::{AceBuilder, Permission};
/// use core_identity::SubjectId;
///
/// let alice = SubjectId::from_bytes([0xa1; 16]);
///
/// // Plain grant
/// let ace = AceBuilder::new()
///     .for_subject(alice)
///     .on("/a/light")
///     .allow(Permission::READ | Permission::WRITE)
///     .build()
///     .unwrap();
///
/// // Office hours only, Monday to Friday
/// let ace = AceBuilder::new()
///     .for_anyone()
///     .on("/a/thermostat")
///     .allow(Permission::READ)
///     .during("20250101T080000/20250101T180000", "FREQ=DAILY; BYDAY=MO,TU,WE,TH,FR")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct AceBuilder {
    subject: Option<SubjectId>,
    resources: Vec<String>,
    permission: Option<Permission>,
    periods: Vec<String>,
    recurrences: Vec<String>,
    owners: Vec<SubjectId>,
}

impl AceBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the subject this entry applies to
    #[must_use]
    pub const fn for_subject(mut self, subject: SubjectId) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Apply this entry to the wildcard (anonymous) subject
    #[must_use]
    pub const fn for_anyone(self) -> Self {
        self.for_subject(WILDCARD_SUBJECT_ID)
    }

    /// Add a resource path (`"*"` for every resource)
    #[must_use]
    pub fn on(mut self, resource: impl Into<String>) -> Self {
        self.resources.push(resource.into());
        self
    }

    /// Grant permission bits, accumulating across calls
    #[must_use]
    pub fn allow(mut self, permission: Permission) -> Self {
        self.permission = Some(self.permission.unwrap_or_default() | permission);
        self
    }

    /// Restrict to a recurring window (empty recurrence = period only)
    #[must_use]
    pub fn during(mut self, period: impl Into<String>, recurrence: impl Into<String>) -> Self {
        self.periods.push(period.into());
        self.recurrences.push(recurrence.into());
        self
    }

    /// Record an owner
    #[must_use]
    pub fn owned_by(mut self, owner: SubjectId) -> Self {
        self.owners.push(owner);
        self
    }

    /// Build the `AccessControlEntry`, returning an error if required fields are missing
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidAce` if the subject or permission is
    /// missing, and any error from [`AccessControlEntry::validate`].
    pub fn build(self) -> Result<AccessControlEntry> {
        let subject = self
            .subject
            .ok_or_else(|| PolicyError::InvalidAce("subject is required".to_string()))?;

        let permission = self
            .permission
            .ok_or_else(|| PolicyError::InvalidAce("permission is required".to_string()))?;

        let ace = AccessControlEntry {
            subject,
            resources: self.resources,
            permission,
            periods: self.periods,
            recurrences: self.recurrences,
            owners: self.owners,
        };
        ace.validate()?;
        Ok(ace)
    }
}

/// Builder for creating `AclStore` instances with a fluent API
///
/// # Examples
///
/// ```
/// use core_policy::{AclBuilder, Permission};
/// use core_identity::SubjectId;
///
/// let acl = AclBuilder::new()
///     .add_ace_with(|ace| ace.for_anyone().on("/oic/res").allow(Permission::READ))
///     .add_ace_with(|ace| {
///         ace.for_subject(SubjectId::from_bytes([7; 16]))
///             .on("*")
///             .allow(Permission::FULL_CONTROL)
///     })
///     .build()
///     .unwrap();
/// assert_eq!(acl.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct AclBuilder {
    aces: Vec<AccessControlEntry>,
    errors: Vec<PolicyError>,
}

impl AclBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry using a builder function
    ///
    /// A failing entry is remembered and reported by [`AclBuilder::build`].
    #[must_use]
    pub fn add_ace_with<F>(mut self, f: F) -> Self
    where
        F: FnOnce(AceBuilder) -> AceBuilder,
    {
        match f(AceBuilder::new()).build() {
            Ok(ace) => self.aces.push(ace),
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Add a pre-constructed entry
    #[must_use]
    pub fn add_ace(mut self, ace: AccessControlEntry) -> Self {
        self.aces.push(ace);
        self
    }

    /// Build the store, in insertion order
    ///
    /// # Errors
    ///
    /// Returns the first entry error, or any error from `AclStore::from_entries`.
    pub fn build(mut self) -> Result<AclStore> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        AclStore::from_entries(self.aces)
    }
}
