// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! # core-policy
//!
//! Pure access-control domain logic for the secure resource manager, with no
//! dependencies on transport, storage or clocks.
//!
//! This crate provides:
//! - CRUDN permission bitmasks and method-to-permission mapping
//! - Access Control Entries and the insertion-ordered ACL store
//! - Access-Manager ACLs (resource -> AMS device)
//! - Recurring time windows (iCalendar-style periods and `RRULE`s)
//! - The local decision procedure with its ordered denial reasons
//!
//! ## Security
//!
//! - Every lookup fails closed: a malformed time window never grants access
//! - Strict size limits on stored entries to prevent algorithmic DoS
//!   - MAX_ACES = 1024
//!   - MAX_URI_LENGTH = 64

#![no_std]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod ace;
pub mod acl;
pub mod amacl;
pub mod builder;
pub mod calendar;
pub mod decision;
pub mod error;
pub mod evaluator;
pub mod permission;
pub mod validity;

pub use ace::AccessControlEntry;
pub use acl::{AclCursor, AclStore};
pub use amacl::{AmaclEntry, AmaclStore};
pub use builder::{AceBuilder, AclBuilder};
pub use calendar::{Period, Recurrence, Weekdays};
pub use decision::{Decision, DenialReason};
/// Re-export commonly used types
pub use error::{PolicyError, Result};
pub use evaluator::{AclEvaluator, LocalOutcome};
pub use permission::{Method, Permission};
pub use validity::{Clock, FixedClock, ICalendarEvaluator, RecurrenceEvaluator, TimeWindowValidator};

/// Maximum number of ACEs held by one store (DoS mitigation)
pub const MAX_ACES: usize = 1024;

/// Maximum length of a resource path, excluding any query string
pub const MAX_URI_LENGTH: usize = 64;

/// Maximum number of period/recurrence pairs per ACE
pub const MAX_PERIODS_PER_ACE: usize = 32;

/// Resource string that matches every resource path
pub const WILDCARD_RESOURCE_URI: &str = "*";
