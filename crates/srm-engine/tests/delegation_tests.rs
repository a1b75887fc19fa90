//! AMS delegation tests: the three-step protocol, its trust checks, every
//! failure exit and the optional timeout

mod common;

use common::*;
use core_identity::{EMPTY_SUBJECT_ID, WILDCARD_SUBJECT_ID};
use core_policy::{AccessControlEntry, AclBuilder, AclStore, AmaclStore, Decision, DenialReason, Method, Permission};
use srm_engine::{
    payload, CapturedRequest, ClientResponse, DelegationStep, Disposition, EngineConfig,
    EngineState, Endpoint, RequestInfo, RequestToken, ResponsePayload, ResponseStatus,
};
use std::time::Duration;

fn led_grant(subject: core_identity::SubjectId, permission: Permission) -> AccessControlEntry {
    AccessControlEntry::new(subject, vec!["/a/led".into()], permission)
}

fn captured() -> CapturedRequest {
    CapturedRequest {
        endpoint: Endpoint::new("192.168.1.33", 40123),
        request: RequestInfo {
            subject: alice(),
            method: Method::Get,
            uri: "/a/led?if=oic.if.baseline".into(),
            token: vec![0xca, 0xfe],
            payload: Vec::new(),
        },
    }
}

/// Engine parked on a delegation for alice reading /a/led
fn parked() -> TestEngine {
    let mut engine = engine(AclStore::new(), amacl_for_ams());
    assert_eq!(
        engine.check_permission(&alice(), "/a/led", Permission::READ),
        Decision::WaitingForAms
    );
    engine.capture_request(captured()).unwrap();
    engine
}

/// Engine parked on the final ACL request
fn parked_at_acl_request() -> TestEngine {
    let mut engine = parked();
    assert_eq!(complete(&mut engine, doxm_reply(ams_id())), None);
    assert_eq!(complete(&mut engine, port_reply(ams_id(), 5684)), None);
    assert_eq!(engine.pending_step(), Some(DelegationStep::RequestAcl));
    engine
}

fn assert_failed_closed(engine: &TestEngine, outcome: Option<Decision>) {
    assert_eq!(outcome, Some(Decision::AMS_ERROR));
    assert_eq!(engine.state(), EngineState::AwaitingRequest);
    assert_eq!(engine.pending_step(), None);

    let resolution = engine.sink().delivered.last().unwrap();
    assert_eq!(resolution.decision, Decision::AMS_ERROR);
    assert_eq!(resolution.request, Some(captured()));
    assert_eq!(
        resolution.disposition(),
        Disposition::Reject(ResponseStatus::Unauthorized)
    );
}

// ============================================================================
// HAPPY PATH
// ============================================================================

#[test]
fn test_delegation_end_to_end() {
    let mut engine = parked();
    assert_eq!(engine.state(), EngineState::AwaitingAmsResponse);
    assert!(engine.context().ams_processing());
    assert_eq!(engine.context().result(), Decision::WaitingForAms);

    // Step 1: multicast doxm discovery
    let first = engine.transport().last().clone();
    assert!(!first.unicast);
    assert_eq!(first.request.destination, None);
    assert_eq!(first.request.uri, payload::doxm_discovery_uri(&ams_id()));
    assert_eq!(engine.pending_step(), Some(DelegationStep::DiscoverAms));

    // Step 2: secure port discovery at the responder
    assert_eq!(complete(&mut engine, doxm_reply(ams_id())), None);
    let second = engine.transport().last().clone();
    assert_eq!(second.request.uri, "/oic/res?rt=oic.sec.doxm");
    assert_eq!(second.request.destination, Some(ams_endpoint()));
    assert_eq!(engine.pending_step(), Some(DelegationStep::DiscoverSecurePort));

    // Step 3: ACL request over the secure port
    assert_eq!(complete(&mut engine, port_reply(ams_id(), 5684)), None);
    let third = engine.transport().last().clone();
    assert!(third.unicast);
    assert_eq!(
        third.request.uri,
        format!("/oic/sec/acl?sub={};rsrc=/a/led", alice().to_base64())
    );
    assert_eq!(
        third.request.destination,
        Some(ams_endpoint().with_secure_port(5684))
    );

    let decision = complete(
        &mut engine,
        acl_reply(ams_id(), &[led_grant(alice(), Permission::READ)]),
    );
    assert_eq!(decision, Some(Decision::Granted));
    assert_eq!(engine.state(), EngineState::AwaitingRequest);
    assert_eq!(engine.acl().len(), 1);

    let resolution = &engine.sink().delivered[0];
    assert_eq!(resolution.decision, Decision::Granted);
    assert_eq!(resolution.request, Some(captured()));
    assert_eq!(resolution.disposition(), Disposition::Forward);
}

#[test]
fn test_second_query_is_local_after_delegation() {
    let mut engine = parked_at_acl_request();
    complete(
        &mut engine,
        acl_reply(ams_id(), &[led_grant(alice(), Permission::READ)]),
    );
    let sent = engine.transport().sent.len();

    assert_eq!(
        engine.check_permission(&alice(), "/a/led", Permission::READ),
        Decision::Granted
    );
    assert_eq!(engine.transport().sent.len(), sent);
    assert_eq!(engine.sink().delivered.len(), 1);
}

#[test]
fn test_delegation_without_captured_request_is_dropped() {
    let mut engine = engine(AclStore::new(), amacl_for_ams());
    engine.check_permission(&alice(), "/a/led", Permission::READ);
    complete(&mut engine, doxm_reply(ams_id()));
    complete(&mut engine, port_reply(ams_id(), 5684));
    complete(
        &mut engine,
        acl_reply(ams_id(), &[led_grant(alice(), Permission::READ)]),
    );

    let resolution = &engine.sink().delivered[0];
    assert_eq!(resolution.decision, Decision::Granted);
    assert_eq!(resolution.disposition(), Disposition::Dropped);
}

#[test]
fn test_insufficient_local_ace_is_delegated() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("/a/led").allow(Permission::NOTIFY))
        .build()
        .unwrap();
    let mut engine = engine(acl, amacl_for_ams());

    assert_eq!(
        engine.check_permission(&alice(), "/a/led", Permission::READ),
        Decision::WaitingForAms
    );
    assert!(engine.context().matching_acl_found());
    assert_eq!(engine.transport().sent.len(), 1);

    complete(&mut engine, doxm_reply(ams_id()));
    complete(&mut engine, port_reply(ams_id(), 5684));
    let decision = complete(
        &mut engine,
        acl_reply(ams_id(), &[led_grant(alice(), Permission::READ)]),
    );
    assert_eq!(decision, Some(Decision::Granted));
    assert_eq!(engine.acl().len(), 2);
}

#[test]
fn test_anonymous_requester_is_asked_about_as_wildcard() {
    let mut engine = engine(AclStore::new(), amacl_for_ams());

    assert_eq!(
        engine.check_permission(&EMPTY_SUBJECT_ID, "/a/led", Permission::READ),
        Decision::WaitingForAms
    );
    complete(&mut engine, doxm_reply(ams_id()));
    complete(&mut engine, port_reply(ams_id(), 5684));
    assert_eq!(
        engine.transport().last().request.uri,
        "/oic/sec/acl?sub=Kg==;rsrc=/a/led"
    );

    let decision = complete(
        &mut engine,
        acl_reply(ams_id(), &[led_grant(WILDCARD_SUBJECT_ID, Permission::READ)]),
    );
    assert_eq!(decision, Some(Decision::Granted));
}

// ============================================================================
// WHEN DELEGATION IS NOT USED
// ============================================================================

#[test]
fn test_resource_outside_amacl_stays_local_even_when_denied() {
    let acl = AclBuilder::new()
        .add_ace_with(|a| a.for_subject(alice()).on("/b/door").allow(Permission::NOTIFY))
        .build()
        .unwrap();
    let mut engine = engine(acl, amacl_for_ams());

    assert_eq!(
        engine.check_permission(&alice(), "/b/door", Permission::READ),
        Decision::Denied(DenialReason::InsufficientPermission)
    );
    assert!(engine.transport().sent.is_empty());
}

#[test]
fn test_resource_outside_amacl_stays_local() {
    let mut engine = engine(AclStore::new(), amacl_for_ams());

    assert_eq!(
        engine.check_permission(&alice(), "/b/door", Permission::READ),
        Decision::Denied(DenialReason::SubjectNotFound)
    );
    assert!(engine.transport().sent.is_empty());
}

#[test]
fn test_new_request_rejected_while_parked() {
    let mut engine = parked();

    assert_eq!(
        engine.check_permission(&bob(), "/a/fan", Permission::READ),
        Decision::ENGINE_ERROR
    );
    assert_eq!(engine.context().subject(), &alice());
    assert_eq!(engine.context().resource(), "/a/led");
    assert_eq!(engine.state(), EngineState::AwaitingAmsResponse);
}

// ============================================================================
// TRUST CHECKS
// ============================================================================

#[test]
fn test_acl_from_spoofed_identity_is_rejected() {
    let mut engine = parked_at_acl_request();

    let outcome = complete(
        &mut engine,
        acl_reply(impostor(), &[led_grant(alice(), Permission::READ)]),
    );
    assert_failed_closed(&engine, outcome);
    assert!(engine.acl().is_empty());
}

#[test]
fn test_unauthenticated_acl_response_is_rejected() {
    let mut engine = parked_at_acl_request();
    let mut response = acl_reply(ams_id(), &[led_grant(alice(), Permission::READ)]);
    response.identity = None;

    let outcome = complete(&mut engine, response);
    assert_failed_closed(&engine, outcome);
}

#[test]
fn test_discovery_reply_from_other_device_is_rejected() {
    let mut engine = parked();

    let outcome = complete(&mut engine, doxm_reply(impostor()));
    assert_failed_closed(&engine, outcome);
    assert_eq!(engine.transport().sent.len(), 1);
}

#[test]
fn test_port_announced_by_other_device_is_rejected() {
    let mut engine = parked();
    complete(&mut engine, doxm_reply(ams_id()));

    let outcome = complete(&mut engine, port_reply(impostor(), 5684));
    assert_failed_closed(&engine, outcome);
}

#[test]
fn test_insecure_port_is_rejected() {
    let mut engine = parked();
    complete(&mut engine, doxm_reply(ams_id()));
    let mut response = port_reply(ams_id(), 5684);
    if let Some(ResponsePayload::Discovery(resources)) = response.payload.as_mut() {
        resources[0].secure = false;
    }

    let outcome = complete(&mut engine, response);
    assert_failed_closed(&engine, outcome);
}

#[test]
fn test_delegated_acl_must_grant() {
    let mut engine = parked_at_acl_request();

    let outcome = complete(
        &mut engine,
        acl_reply(ams_id(), &[led_grant(alice(), Permission::WRITE)]),
    );
    assert_failed_closed(&engine, outcome);
}

#[test]
fn test_delegated_acl_for_someone_else_does_not_grant() {
    let mut engine = parked_at_acl_request();

    let outcome = complete(
        &mut engine,
        acl_reply(ams_id(), &[led_grant(bob(), Permission::READ)]),
    );
    assert_failed_closed(&engine, outcome);
    assert_eq!(engine.transport().sent.len(), 3);
}

// ============================================================================
// FAILURE EXITS
// ============================================================================

#[test]
fn test_missing_response_fails_each_step() {
    for steps_done in 0..3 {
        let mut engine = parked();
        if steps_done > 0 {
            complete(&mut engine, doxm_reply(ams_id()));
        }
        if steps_done > 1 {
            complete(&mut engine, port_reply(ams_id(), 5684));
        }

        let token = engine.pending_token().unwrap();
        let outcome = engine.handle_response(token, None);
        assert_failed_closed(&engine, outcome);
    }
}

#[test]
fn test_error_status_fails_each_step() {
    for steps_done in 0..3 {
        let mut engine = parked();
        let mut response = doxm_reply(ams_id());
        if steps_done > 0 {
            complete(&mut engine, doxm_reply(ams_id()));
            response = port_reply(ams_id(), 5684);
        }
        if steps_done > 1 {
            complete(&mut engine, port_reply(ams_id(), 5684));
            response = acl_reply(ams_id(), &[led_grant(alice(), Permission::READ)]);
        }
        response.status = ResponseStatus::NotFound;

        let outcome = complete(&mut engine, response);
        assert_failed_closed(&engine, outcome);
    }
}

#[test]
fn test_wrong_payload_kind_fails() {
    let mut engine = parked();
    let outcome = complete(&mut engine, port_reply(ams_id(), 5684));
    assert_failed_closed(&engine, outcome);

    let mut engine = parked();
    complete(&mut engine, doxm_reply(ams_id()));
    let outcome = complete(&mut engine, doxm_reply(ams_id()));
    assert_failed_closed(&engine, outcome);
}

#[test]
fn test_malformed_acl_payload_fails() {
    let mut engine = parked_at_acl_request();
    let response = ClientResponse {
        status: ResponseStatus::Ok,
        identity: Some(ams_id()),
        endpoint: ams_endpoint().with_secure_port(5684),
        payload: Some(ResponsePayload::Security("{\"acl\":\"nope\"}".into())),
    };

    let outcome = complete(&mut engine, response);
    assert_failed_closed(&engine, outcome);
    assert!(engine.acl().is_empty());
}

#[test]
fn test_stale_completion_is_ignored() {
    let mut engine = parked();
    let token = engine.pending_token().unwrap();

    let outcome = engine.handle_response(RequestToken(token.0 + 7), Some(doxm_reply(impostor())));
    assert_eq!(outcome, None);
    assert_eq!(engine.state(), EngineState::AwaitingAmsResponse);
    assert_eq!(engine.pending_step(), Some(DelegationStep::DiscoverAms));

    assert_eq!(complete(&mut engine, doxm_reply(ams_id())), None);
    assert_eq!(engine.pending_step(), Some(DelegationStep::DiscoverSecurePort));
}

#[test]
fn test_late_completion_after_resolution_is_ignored() {
    let mut engine = parked();
    let token = engine.pending_token().unwrap();
    engine.handle_response(token, None);

    assert_eq!(engine.handle_response(token, Some(doxm_reply(ams_id()))), None);
    assert_eq!(engine.sink().delivered.len(), 1);
}

#[test]
fn test_discovery_send_failure_resolves_synchronously() {
    let mut engine = engine(AclStore::new(), amacl_for_ams());
    engine.transport_mut().offline = true;

    assert_eq!(
        engine.check_permission(&alice(), "/a/led", Permission::READ),
        Decision::AMS_ERROR
    );
    assert_eq!(engine.state(), EngineState::AwaitingRequest);
    assert!(engine.sink().delivered.is_empty());
}

#[test]
fn test_send_failure_mid_protocol() {
    let mut engine = parked();
    engine.transport_mut().offline = true;

    let outcome = complete(&mut engine, doxm_reply(ams_id()));
    assert_failed_closed(&engine, outcome);
}

#[test]
fn test_set_state_resolves_parked_delegation() {
    let mut engine = parked();
    engine.set_state(EngineState::AwaitingRequest);

    assert_eq!(engine.sink().delivered.len(), 1);
    assert_eq!(engine.sink().delivered[0].decision, Decision::AMS_ERROR);
    assert_eq!(engine.pending_step(), None);
}

#[test]
fn test_deinit_resolves_parked_delegation() {
    let mut engine = parked();
    engine.deinit();

    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(engine.sink().delivered[0].decision, Decision::AMS_ERROR);
}

// ============================================================================
// TIMEOUT
// ============================================================================

#[test]
fn test_expire_delegation_after_timeout() {
    let config = EngineConfig {
        ams_response_timeout_secs: Some(5),
        ..EngineConfig::default()
    };
    let mut engine = engine_with_config(config, AclStore::new(), amacl_for_ams());
    engine.check_permission(&alice(), "/a/led", Permission::READ);
    engine.capture_request(captured()).unwrap();
    let started = engine.delegation_started_at().unwrap();

    assert_eq!(engine.expire_delegation(started + Duration::from_secs(4)), None);
    assert_eq!(engine.state(), EngineState::AwaitingAmsResponse);

    let outcome = engine.expire_delegation(started + Duration::from_secs(5));
    assert_failed_closed(&engine, outcome);
}

#[test]
fn test_no_timeout_parks_indefinitely() {
    let mut engine = parked();
    let started = engine.delegation_started_at().unwrap();

    assert_eq!(
        engine.expire_delegation(started + Duration::from_secs(86_400)),
        None
    );
    assert_eq!(engine.state(), EngineState::AwaitingAmsResponse);
}

#[test]
fn test_expire_without_delegation_is_noop() {
    let config = EngineConfig {
        ams_response_timeout_secs: Some(1),
        ..EngineConfig::default()
    };
    let mut engine = engine_with_config(config, AclStore::new(), AmaclStore::new());

    assert_eq!(
        engine.expire_delegation(std::time::Instant::now() + Duration::from_secs(10)),
        None
    );
    assert!(engine.sink().delivered.is_empty());
}
