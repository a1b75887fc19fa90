// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! # srm-open-core
//!
//! Access-control decision engine for resource-oriented IoT devices.
//!
//! This crate provides a unified API for the secure resource manager:
//!
//! - **Identity**: 128-bit subject identifiers with the reserved wildcard
//! - **Policy**: ACEs, ACL/AMACL stores, time windows and the local decision
//!   procedure, all `no_std`
//! - **Engine**: the decision state machine, AMS delegation and the request
//!   gate in front of resource handlers
//!
//! ## Quick Start
//!
//! ```rust
//! use srm_open_core::identity::SubjectId;
//! use srm_open_core::policy::calendar::parse_date_time;
//! use srm_open_core::policy::{AclBuilder, AclEvaluator, Permission, TimeWindowValidator};
//! use srm_open_core::Decision;
//!
//! let alice = SubjectId::from_bytes([0xa1; 16]);
//! let acl = AclBuilder::new()
//!     .add_ace_with(|ace| ace.for_subject(alice).on("/a/led").allow(Permission::READ))
//!     .build()
//!     .unwrap();
//!
//! let validator = TimeWindowValidator::new();
//! let now = parse_date_time("20250602T120000").unwrap();
//! let outcome = AclEvaluator::new(&acl, &validator).evaluate(&alice, "/a/led", Permission::READ, now);
//! assert_eq!(outcome.decision, Decision::Granted);
//! ```
//!
//! ## Architecture
//!
//! This facade crate re-exports the following modules:
//!
//! - [`identity`] - subject identifiers (from `core-identity`)
//! - [`policy`] - ACL matching and time windows (from `core-policy`)
//! - [`engine`] - decision state machine and delegation (from `srm-engine`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Identity module.
///
/// Re-exports `core_identity` for subject identifiers and their base64 codec.
pub mod identity {
    pub use core_identity::*;
}

/// Policy module.
///
/// Re-exports `core_policy` for ACL storage and the local decision procedure.
pub mod policy {
    pub use core_policy::*;
}

/// Engine module.
///
/// Re-exports `srm_engine` for the decision state machine and AMS delegation.
pub mod engine {
    pub use srm_engine::*;
}

// Convenience re-exports at root level
pub use core_identity::SubjectId;
pub use core_policy::{AccessControlEntry, AclStore, Decision, DenialReason, Permission};
pub use srm_engine::{PolicyEngine, SecureResourceManager};
