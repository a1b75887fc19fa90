//! Local decision procedure (SRP - evaluation only, no state)
//!
//! Resolves `(subject, resource, permission)` against an [`AclStore`]:
//!
//! 1. Walk every ACE of the subject in insertion order. Each ACE moves the
//!    tentative result through `SubjectNotFound -> ResourceNotFound ->
//!    InvalidPeriod -> InsufficientPermission -> Granted`; the first ACE to
//!    reach `Granted` stops the walk. A later ACE may still grant after an
//!    earlier one denied, and the most specific denial reached by any ACE
//!    is reported.
//! 2. If no ACE of the subject listed the resource, repeat the walk for the
//!    wildcard subject. Once any ACE of the literal subject lists the
//!    resource, the wildcard walk is skipped even if that ACE denied.
//!
//! Owner bypass and AMS delegation are the engine's business, not this
//! module's.

use crate::ace::AccessControlEntry;
use crate::acl::{AclCursor, AclStore};
use crate::decision::{Decision, DenialReason};
use crate::permission::Permission;
use crate::validity::{ICalendarEvaluator, RecurrenceEvaluator, TimeWindowValidator};
use chrono::NaiveDateTime;
use core_identity::{SubjectId, WILDCARD_SUBJECT_ID};

/// Result of the local decision procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalOutcome {
    /// `Granted` or a local denial reason
    pub decision: Decision,
    /// True once any visited ACE listed the requested resource
    pub matching_acl_found: bool,
}

impl LocalOutcome {
    const fn not_found() -> Self {
        Self {
            decision: Decision::Denied(DenialReason::SubjectNotFound),
            matching_acl_found: false,
        }
    }

    /// Keep whichever outcome got further along the procedure
    fn most_specific(self, other: Self) -> Self {
        let matching_acl_found = self.matching_acl_found || other.matching_acl_found;
        let decision = match (self.decision, other.decision) {
            (Decision::Granted, _) | (_, Decision::Granted) => Decision::Granted,
            (Decision::Denied(a), Decision::Denied(b)) if b.specificity() > a.specificity() => {
                Decision::Denied(b)
            }
            (current, _) => current,
        };
        Self {
            decision,
            matching_acl_found,
        }
    }
}

/// Evaluates requests against an ACL store
#[derive(Debug)]
pub struct AclEvaluator<'a, E = ICalendarEvaluator> {
    acl: &'a AclStore,
    validator: &'a TimeWindowValidator<E>,
}

impl<'a, E: RecurrenceEvaluator> AclEvaluator<'a, E> {
    /// Create an evaluator over `acl`
    #[must_use]
    pub const fn new(acl: &'a AclStore, validator: &'a TimeWindowValidator<E>) -> Self {
        Self { acl, validator }
    }

    /// Run the full local procedure, wildcard fallback included
    #[must_use]
    pub fn evaluate(
        &self,
        subject: &SubjectId,
        resource: &str,
        requested: Permission,
        now: NaiveDateTime,
    ) -> LocalOutcome {
        let outcome = self.evaluate_subject(subject, resource, requested, now);

        if outcome.matching_acl_found || subject.is_wildcard() {
            return outcome;
        }

        let wildcard = self.evaluate_subject(&WILDCARD_SUBJECT_ID, resource, requested, now);
        outcome.most_specific(wildcard)
    }

    /// Walk only the ACEs of `subject`, no wildcard fallback
    #[must_use]
    pub fn evaluate_subject(
        &self,
        subject: &SubjectId,
        resource: &str,
        requested: Permission,
        now: NaiveDateTime,
    ) -> LocalOutcome {
        let mut outcome = LocalOutcome::not_found();
        let mut cursor = AclCursor::START;

        while let Some(ace) = self.acl.find_next(subject, &mut cursor) {
            outcome = outcome.most_specific(self.check_ace(ace, resource, requested, now));
            if outcome.decision.is_granted() {
                break;
            }
        }

        outcome
    }

    fn check_ace(
        &self,
        ace: &AccessControlEntry,
        resource: &str,
        requested: Permission,
        now: NaiveDateTime,
    ) -> LocalOutcome {
        if !ace.resource_matches(resource) {
            return LocalOutcome {
                decision: Decision::Denied(DenialReason::ResourceNotFound),
                matching_acl_found: false,
            };
        }

        let decision = if !self.validator.is_within_valid_time(ace, now) {
            Decision::Denied(DenialReason::InvalidPeriod)
        } else if !Permission::is_sufficient(ace.permission, requested) {
            Decision::Denied(DenialReason::InsufficientPermission)
        } else {
            Decision::Granted
        };

        LocalOutcome {
            decision,
            matching_acl_found: true,
        }
    }
}
