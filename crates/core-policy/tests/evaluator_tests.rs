//! Local decision procedure tests
//!
//! Covers the ordered denial reasons, continuation across several ACEs of
//! one subject and the wildcard fallback boundary.

use chrono::NaiveDateTime;
use core_identity::SubjectId;
use core_policy::calendar::parse_date_time;
use core_policy::{
    AceBuilder, AclBuilder, AclEvaluator, AclStore, Decision, DenialReason, Permission,
    TimeWindowValidator,
};

fn alice() -> SubjectId {
    SubjectId::from_bytes([0xa1; 16])
}

fn bob() -> SubjectId {
    SubjectId::from_bytes([0xb0; 16])
}

fn noon() -> NaiveDateTime {
    parse_date_time("20250602T120000").unwrap()
}

fn evaluate(acl: &AclStore, subject: SubjectId, resource: &str, requested: Permission) -> Decision {
    let validator = TimeWindowValidator::new();
    AclEvaluator::new(acl, &validator)
        .evaluate(&subject, resource, requested, noon())
        .decision
}

#[test]
fn test_subject_not_found() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(bob()).on("/a/led").allow(Permission::READ))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::READ),
        Decision::Denied(DenialReason::SubjectNotFound)
    );
}

#[test]
fn test_empty_store_is_subject_not_found() {
    assert_eq!(
        evaluate(&AclStore::new(), alice(), "/a/led", Permission::READ),
        Decision::Denied(DenialReason::SubjectNotFound)
    );
}

#[test]
fn test_resource_not_found() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("/a/fan").allow(Permission::READ))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::READ),
        Decision::Denied(DenialReason::ResourceNotFound)
    );
}

#[test]
fn test_invalid_period() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| {
            a.for_subject(alice())
                .on("/a/led")
                .allow(Permission::READ)
                .during("20200101/20200102", "")
        })
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::READ),
        Decision::Denied(DenialReason::InvalidPeriod)
    );
}

#[test]
fn test_insufficient_permission() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("/a/led").allow(Permission::READ))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::WRITE),
        Decision::Denied(DenialReason::InsufficientPermission)
    );
}

#[test]
fn test_granted_within_window() {
    // 2025-06-02 is a Monday
    let acl = AclBuilder::new()
        .add_ace_with(|a| {
            a.for_subject(alice())
                .on("/a/led")
                .allow(Permission::READ)
                .during("20250101T080000/20250101T180000", "FREQ=DAILY; BYDAY=MO")
        })
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::READ),
        Decision::Granted
    );
}

#[test]
fn test_wildcard_resource_entry() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("*").allow(Permission::FULL_CONTROL))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/any/thing", Permission::DELETE),
        Decision::Granted
    );
}

#[test]
fn test_later_ace_grants_after_earlier_denial() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("/a/led").allow(Permission::WRITE))
        .add_ace_with(|a| a.for_subject(alice()).on("/a/led").allow(Permission::READ))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::READ),
        Decision::Granted
    );
}

#[test]
fn test_later_ace_after_expired_ace() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| {
            a.for_subject(alice())
                .on("/a/led")
                .allow(Permission::READ)
                .during("20200101/20200102", "")
        })
        .add_ace_with(|a| a.for_subject(alice()).on("/a/led").allow(Permission::READ))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::READ),
        Decision::Granted
    );
}

#[test]
fn test_most_specific_reason_across_aces() {
    // First ACE reaches InsufficientPermission, second only ResourceNotFound
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("/a/led").allow(Permission::READ))
        .add_ace_with(|a| a.for_subject(alice()).on("/a/fan").allow(Permission::WRITE))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::WRITE),
        Decision::Denied(DenialReason::InsufficientPermission)
    );
}

#[test]
fn test_wildcard_fallback_when_subject_unknown() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_anyone().on("/a/led").allow(Permission::READ))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::READ),
        Decision::Granted
    );
}

#[test]
fn test_wildcard_fallback_when_subject_lacks_resource() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("/a/fan").allow(Permission::READ))
        .add_ace_with(|a| a.for_anyone().on("/a/led").allow(Permission::READ))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::READ),
        Decision::Granted
    );
}

#[test]
fn test_wildcard_skipped_once_subject_ace_lists_resource() {
    // Alice's own ACE lists the resource but denies on permission. The
    // wildcard ACE would grant, but the fallback is not reached.
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("/a/led").allow(Permission::READ))
        .add_ace_with(|a| a.for_anyone().on("/a/led").allow(Permission::FULL_CONTROL))
        .build()
        .unwrap();

    let validator = TimeWindowValidator::new();
    let outcome = AclEvaluator::new(&acl, &validator).evaluate(
        &alice(),
        "/a/led",
        Permission::WRITE,
        noon(),
    );

    assert_eq!(
        outcome.decision,
        Decision::Denied(DenialReason::InsufficientPermission)
    );
    assert!(outcome.matching_acl_found);
}

#[test]
fn test_wildcard_skipped_when_subject_ace_expired() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| {
            a.for_subject(alice())
                .on("/a/led")
                .allow(Permission::READ)
                .during("20200101/20200102", "")
        })
        .add_ace_with(|a| a.for_anyone().on("/a/led").allow(Permission::READ))
        .build()
        .unwrap();

    assert_eq!(
        evaluate(&acl, alice(), "/a/led", Permission::READ),
        Decision::Denied(DenialReason::InvalidPeriod)
    );
}

#[test]
fn test_wildcard_subject_is_not_searched_twice() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_anyone().on("/a/fan").allow(Permission::READ))
        .build()
        .unwrap();

    let validator = TimeWindowValidator::new();
    let outcome = AclEvaluator::new(&acl, &validator).evaluate(
        &SubjectId::wildcard(),
        "/a/led",
        Permission::READ,
        noon(),
    );

    assert_eq!(
        outcome.decision,
        Decision::Denied(DenialReason::ResourceNotFound)
    );
    assert!(!outcome.matching_acl_found);
}

#[test]
fn test_resource_not_found_survives_empty_wildcard_pass() {
    // The wildcard pass finds no subject at all; the literal subject's
    // more specific reason is the one reported.
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("/a/fan").allow(Permission::READ))
        .build()
        .unwrap();

    let validator = TimeWindowValidator::new();
    let outcome =
        AclEvaluator::new(&acl, &validator).evaluate(&alice(), "/a/led", Permission::READ, noon());

    assert_eq!(
        outcome.decision,
        Decision::Denied(DenialReason::ResourceNotFound)
    );
    assert!(!outcome.matching_acl_found);
}

#[test]
fn test_untrusted_clock_ignores_windows() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| {
            a.for_subject(alice())
                .on("/a/led")
                .allow(Permission::READ)
                .during("20200101/20200102", "")
        })
        .build()
        .unwrap();

    let validator = TimeWindowValidator::untrusted_clock();
    let outcome =
        AclEvaluator::new(&acl, &validator).evaluate(&alice(), "/a/led", Permission::READ, noon());
    assert_eq!(outcome.decision, Decision::Granted);
}

#[test]
fn test_ace_builder_requires_subject_and_permission() {
    assert!(AceBuilder::new().on("/a").allow(Permission::READ).build().is_err());
    assert!(AceBuilder::new().for_anyone().on("/a").build().is_err());
    assert!(AceBuilder::new()
        .for_anyone()
        .allow(Permission::READ)
        .build()
        .is_err());
}
