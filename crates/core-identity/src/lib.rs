// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! # core-identity
//!
//! Subject identifiers for the secure resource manager.
//!
//! Every requester, device owner and Access Management Service is named by a
//! raw 128-bit identifier. Identifiers are opaque bytes: equality is an exact
//! byte-for-byte comparison, with no normalization and no prefix matching.
//!
//! ## Reserved identifiers
//!
//! - [`WILDCARD_SUBJECT_ID`]: the anonymous subject. ACEs bound to it apply to
//!   any requester that has no ACE of its own for the resource.
//! - [`EMPTY_SUBJECT_ID`]: all-zero identifier, used for requests that carry
//!   no authenticated identity.
//!
//! ## Example
//!
//! ```
//! use core_identity::{SubjectId, WILDCARD_SUBJECT_ID};
//!
//! let alice = SubjectId::from_bytes([7u8; 16]);
//! assert!(!alice.is_wildcard());
//! assert!(WILDCARD_SUBJECT_ID.is_wildcard());
//!
//! let encoded = alice.to_base64();
//! assert_eq!(SubjectId::from_base64(&encoded).unwrap(), alice);
//! ```

#![no_std]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

mod error;

pub use error::{IdentityError, Result};

use alloc::string::String;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length in bytes of every subject identifier (128 bits)
pub const UUID_LENGTH: usize = 16;

/// Number of significant bytes in the wildcard identifier
pub const WILDCARD_SUBJECT_ID_LEN: usize = 1;

/// The reserved anonymous subject (`'*'` followed by zero bytes)
pub const WILDCARD_SUBJECT_ID: SubjectId = SubjectId::wildcard();

/// The all-zero subject carried by unauthenticated requests
pub const EMPTY_SUBJECT_ID: SubjectId = SubjectId([0u8; UUID_LENGTH]);

/// Raw 128-bit identifier of a subject, device owner or AMS device
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SubjectId([u8; UUID_LENGTH]);

impl SubjectId {
    /// Wrap raw identifier bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; UUID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The reserved wildcard identifier
    #[must_use]
    pub const fn wildcard() -> Self {
        let mut bytes = [0u8; UUID_LENGTH];
        bytes[0] = b'*';
        Self(bytes)
    }

    /// Build an identifier from a slice of exactly [`UUID_LENGTH`] bytes
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidLength` for any other slice length
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let id: [u8; UUID_LENGTH] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidLength { length: bytes.len() })?;
        Ok(Self(id))
    }

    /// Raw identifier bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; UUID_LENGTH] {
        &self.0
    }

    /// Exact byte comparison against the wildcard identifier
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        *self == WILDCARD_SUBJECT_ID
    }

    /// True if every byte is zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == EMPTY_SUBJECT_ID
    }

    /// Encode as standard base64
    ///
    /// The wildcard only encodes its significant byte (`"Kg=="`), every other
    /// identifier encodes all [`UUID_LENGTH`] bytes.
    #[must_use]
    pub fn to_base64(&self) -> String {
        if self.is_wildcard() {
            STANDARD.encode(&self.0[..WILDCARD_SUBJECT_ID_LEN])
        } else {
            STANDARD.encode(self.0)
        }
    }

    /// Decode from standard base64
    ///
    /// Shorter payloads (such as the encoded wildcard) are zero-padded.
    ///
    /// # Errors
    ///
    /// - `IdentityError::InvalidEncoding` if the text is not valid base64
    /// - `IdentityError::InvalidLength` if it decodes to 0 or more than 16 bytes
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| IdentityError::InvalidEncoding(alloc::format!("{}", e)))?;

        if decoded.is_empty() || decoded.len() > UUID_LENGTH {
            return Err(IdentityError::InvalidLength {
                length: decoded.len(),
            });
        }

        let mut bytes = [0u8; UUID_LENGTH];
        bytes[..decoded.len()].copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

impl From<uuid::Uuid> for SubjectId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(*uuid.as_bytes())
    }
}

impl From<SubjectId> for uuid::Uuid {
    fn from(id: SubjectId) -> Self {
        uuid::Uuid::from_bytes(id.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            return f.write_str("*");
        }
        fmt::Display::fmt(&uuid::Uuid::from_bytes(self.0).hyphenated(), f)
    }
}

impl fmt::Debug for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubjectId({})", self)
    }
}

/// Parses `*`, a textual UUID, or the base64 form
impl FromStr for SubjectId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "*" {
            return Ok(WILDCARD_SUBJECT_ID);
        }
        if let Ok(uuid) = uuid::Uuid::try_parse(s) {
            return Ok(uuid.into());
        }
        Self::from_base64(s)
            .map_err(|_| IdentityError::InvalidFormat(alloc::format!("unrecognised subject id '{}'", s)))
    }
}

impl Serialize for SubjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for SubjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_layout() {
        assert_eq!(WILDCARD_SUBJECT_ID.as_bytes()[0], b'*');
        assert!(WILDCARD_SUBJECT_ID.as_bytes()[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_wildcard_base64() {
        assert_eq!(WILDCARD_SUBJECT_ID.to_base64(), "Kg==");
        assert_eq!(SubjectId::from_base64("Kg==").unwrap(), WILDCARD_SUBJECT_ID);
    }

    #[test]
    fn test_empty_is_not_wildcard() {
        assert!(EMPTY_SUBJECT_ID.is_empty());
        assert!(!EMPTY_SUBJECT_ID.is_wildcard());
        assert!(SubjectId::default().is_empty());
    }

    #[test]
    fn test_from_slice_length() {
        assert!(SubjectId::from_slice(&[1u8; 16]).is_ok());
        assert!(matches!(
            SubjectId::from_slice(&[1u8; 15]),
            Err(IdentityError::InvalidLength { length: 15 })
        ));
    }
}
