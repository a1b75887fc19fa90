//! Insertion-ordered ACL store
//!
//! Holds the ACEs of one device. Several ACEs may share a subject; lookups
//! walk them in insertion order through an [`AclCursor`].
//!
//! # Security
//!
//! - The store never holds more than `MAX_ACES` entries (DoS mitigation)
//! - Every ACE is validated on insertion

use crate::ace::AccessControlEntry;
use crate::error::{PolicyError, Result};
use crate::permission::Permission;
use crate::MAX_ACES;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core_identity::{SubjectId, WILDCARD_SUBJECT_ID};
use serde::{Deserialize, Serialize};

/// Resources readable by anyone in a freshly provisioned device
pub const DEFAULT_ACL_RESOURCES: &[&str] = &[
    "/oic/res",
    "/oic/d",
    "/oic/p",
    "/oic/res/types/d",
    "/oic/ad",
    "/oic/sec/acl",
    "/oic/sec/doxm",
    "/oic/sec/pstat",
];

/// Opaque position in an [`AclStore`] walk
///
/// Start with [`AclCursor::START`] and pass the same cursor back to
/// [`AclStore::find_next`] to enumerate every ACE of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AclCursor(usize);

impl AclCursor {
    /// Cursor positioned before the first entry
    pub const START: Self = Self(0);
}

/// Ordered collection of ACEs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclStore {
    #[serde(rename = "acl")]
    entries: Vec<AccessControlEntry>,
}

impl AclStore {
    /// Create an empty store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Store holding only the default ACL, owned by `device_id`
    ///
    /// The default ACL lets the wildcard subject READ the discovery and
    /// security resources every device exposes.
    #[must_use]
    pub fn with_default_acl(device_id: SubjectId) -> Self {
        let resources = DEFAULT_ACL_RESOURCES
            .iter()
            .map(|r| (*r).to_string())
            .collect::<Vec<String>>();
        let ace = AccessControlEntry::new(WILDCARD_SUBJECT_ID, resources, Permission::READ)
            .with_owner(device_id);
        Self { entries: alloc::vec![ace] }
    }

    /// Build a store from a list of ACEs
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or `TooManyAces` if the list is
    /// longer than `MAX_ACES`.
    pub fn from_entries(entries: Vec<AccessControlEntry>) -> Result<Self> {
        let mut store = Self::new();
        store.extend(entries)?;
        Ok(store)
    }

    /// Next ACE for `subject` at or after `cursor`, advancing the cursor
    ///
    /// Exact subject match only: the wildcard subject is found only when
    /// it is the subject being searched for.
    pub fn find_next(
        &self,
        subject: &SubjectId,
        cursor: &mut AclCursor,
    ) -> Option<&AccessControlEntry> {
        while let Some(ace) = self.entries.get(cursor.0) {
            cursor.0 += 1;
            if ace.subject == *subject {
                return Some(ace);
            }
        }
        None
    }

    /// Every ACE for `subject`, in insertion order
    pub fn entries_for<'a>(
        &'a self,
        subject: &'a SubjectId,
    ) -> impl Iterator<Item = &'a AccessControlEntry> + 'a {
        self.entries.iter().filter(move |ace| ace.subject == *subject)
    }

    /// Append one ACE at the end of the list
    ///
    /// # Errors
    ///
    /// - `TooManyAces` if the store is full
    /// - any error from [`AccessControlEntry::validate`]
    pub fn append(&mut self, ace: AccessControlEntry) -> Result<()> {
        if self.entries.len() >= MAX_ACES {
            return Err(PolicyError::TooManyAces {
                max: MAX_ACES,
                attempted: self.entries.len() + 1,
            });
        }
        ace.validate()?;
        self.entries.push(ace);
        Ok(())
    }

    /// Append a batch of ACEs, all or nothing
    ///
    /// # Errors
    ///
    /// Nothing is inserted if the batch would overflow `MAX_ACES` or if
    /// any ACE fails validation.
    pub fn extend(&mut self, aces: Vec<AccessControlEntry>) -> Result<()> {
        let attempted = self.entries.len() + aces.len();
        if attempted > MAX_ACES {
            return Err(PolicyError::TooManyAces {
                max: MAX_ACES,
                attempted,
            });
        }
        for ace in &aces {
            ace.validate()?;
        }
        self.entries.extend(aces);
        Ok(())
    }

    /// Remove ACEs of `subject`
    ///
    /// With `resource == None` every ACE of the subject is removed. With a
    /// resource, the resource is dropped from each ACE of the subject that
    /// lists it, and an ACE left with no resources is removed entirely.
    ///
    /// Returns how many ACEs were modified or removed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAce` when `subject` is the wildcard: the default ACL
    /// cannot be deleted this way.
    pub fn remove(&mut self, subject: &SubjectId, resource: Option<&str>) -> Result<usize> {
        if subject.is_wildcard() {
            return Err(PolicyError::InvalidAce(
                "Wildcard subject ACEs cannot be removed".to_string(),
            ));
        }

        let before = self.entries.len();
        match resource.filter(|r| !r.is_empty()) {
            None => {
                self.entries.retain(|ace| ace.subject != *subject);
                Ok(before - self.entries.len())
            }
            Some(resource) => {
                let mut touched = 0;
                for ace in self.entries.iter_mut().filter(|ace| ace.subject == *subject) {
                    let count = ace.resources.len();
                    ace.resources.retain(|r| r != resource);
                    if ace.resources.len() != count {
                        touched += 1;
                    }
                }
                self.entries.retain(|ace| !ace.resources.is_empty());
                Ok(touched)
            }
        }
    }

    /// All entries in insertion order
    #[must_use]
    pub fn entries(&self) -> &[AccessControlEntry] {
        &self.entries
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> core::slice::Iter<'_, AccessControlEntry> {
        self.entries.iter()
    }

    /// Number of ACEs
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no ACEs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a AclStore {
    type Item = &'a AccessControlEntry;
    type IntoIter = core::slice::Iter<'a, AccessControlEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
