//! Delegation to a remote Access Management Service (SRP - protocol steps only)
//!
//! When no local ACE grants a request and the resource is listed in the
//! AMACL, the engine asks the responsible AMS for an ACL in three
//! asynchronous steps:
//!
//! 1. `DiscoverAms`: multicast `GET /oic/sec/doxm?deviceid=<ams>`. The
//!    reply must be a doxm document announcing exactly the AMS id.
//! 2. `DiscoverSecurePort`: unicast `GET /oic/res?rt=oic.sec.doxm` to the
//!    responder. The first announced resource must belong to the AMS and
//!    carry a secure port.
//! 3. `RequestAcl`: secure unicast `GET /oic/sec/acl?sub=..;rsrc=..`. The
//!    secure session must authenticate the AMS id.
//!
//! Every check failure ends the delegation. Completions whose token does
//! not match the step in flight are ignored.

use crate::error::Result;
use crate::payload;
use crate::transport::{
    AmsTransport, CapturedRequest, ClientResponse, OutboundRequest, RequestToken, ResponsePayload,
};
use crate::AMS_TARGET;
use core_identity::SubjectId;
use core_policy::AccessControlEntry;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Step of a delegation currently waiting for a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelegationStep {
    /// Multicast doxm discovery sent
    DiscoverAms,
    /// Secure port discovery sent to the authenticated responder
    DiscoverSecurePort,
    /// ACL request sent over the secure session
    RequestAcl,
}

impl fmt::Display for DelegationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DiscoverAms => "discover-ams",
            Self::DiscoverSecurePort => "discover-secure-port",
            Self::RequestAcl => "request-acl",
        };
        f.write_str(text)
    }
}

/// Result of feeding one completion to the delegate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Next request sent, still waiting
    Continue,
    /// Completion does not belong to the step in flight; nothing changed
    Stale,
    /// Delegation ended without an ACL
    Failed(&'static str),
    /// The AMS answered with these ACEs
    AclReceived(Vec<AccessControlEntry>),
}

/// Per-engine delegation context
///
/// Exists between engine init and deinit; holds at most one delegation.
#[derive(Debug, Default)]
pub struct AmsDelegate {
    ams_device_id: Option<SubjectId>,
    pending: Option<(DelegationStep, RequestToken)>,
    captured: Option<CapturedRequest>,
    started_at: Option<Instant>,
    next_token: u64,
}

impl AmsDelegate {
    /// Idle delegate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a delegation to `ams_device_id` with the multicast discovery
    ///
    /// # Errors
    ///
    /// Propagates the transport error; the delegate is reset in that case.
    pub fn discover_ams<T: AmsTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        ams_device_id: SubjectId,
        now: Instant,
    ) -> Result<()> {
        self.reset();
        self.ams_device_id = Some(ams_device_id);
        self.started_at = Some(now);

        let token = self.issue_token();
        let request = OutboundRequest {
            token,
            uri: payload::doxm_discovery_uri(&ams_device_id),
            destination: None,
        };
        info!(target: AMS_TARGET, ams = %ams_device_id, uri = %request.uri, "discovering AMS");

        if let Err(e) = transport.send_discovery(request) {
            warn!(target: AMS_TARGET, error = %e, "AMS discovery could not be sent");
            self.reset();
            return Err(e);
        }
        self.pending = Some((DelegationStep::DiscoverAms, token));
        Ok(())
    }

    /// Advance the delegation with the completion of request `token`
    ///
    /// `response` is `None` when the transport gave up without a reply.
    /// `subject` and `resource` are those of the decision being delegated.
    pub fn handle_response<T: AmsTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        token: RequestToken,
        response: Option<&ClientResponse>,
        subject: &SubjectId,
        resource: &str,
    ) -> StepOutcome {
        let step = match self.pending {
            Some((step, expected)) if expected == token => step,
            _ => {
                debug!(target: AMS_TARGET, token = token.0, "ignoring stale completion");
                return StepOutcome::Stale;
            }
        };
        self.pending = None;

        let Some(ams_device_id) = self.ams_device_id else {
            return StepOutcome::Failed("no AMS selected");
        };
        let Some(response) = response else {
            warn!(target: AMS_TARGET, %step, "request failed without response");
            return StepOutcome::Failed("no response");
        };
        if !response.status.is_success() {
            warn!(target: AMS_TARGET, %step, status = ?response.status, "error response");
            return StepOutcome::Failed("error status");
        }

        let outcome = match step {
            DelegationStep::DiscoverAms => self.on_ams_discovered(transport, response, ams_device_id),
            DelegationStep::DiscoverSecurePort => {
                self.on_secure_port(transport, response, ams_device_id, subject, resource)
            }
            DelegationStep::RequestAcl => Self::on_acl(response, ams_device_id),
        };

        if let StepOutcome::Failed(why) = outcome {
            warn!(target: AMS_TARGET, %step, reason = why, "delegation step failed");
        }
        outcome
    }

    fn on_ams_discovered<T: AmsTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        response: &ClientResponse,
        ams_device_id: SubjectId,
    ) -> StepOutcome {
        let Some(ResponsePayload::Security(json)) = &response.payload else {
            return StepOutcome::Failed("expected doxm payload");
        };
        match payload::parse_doxm(json) {
            Ok(device_id) if device_id == ams_device_id => {}
            Ok(_) => return StepOutcome::Failed("responder is not the AMS"),
            Err(_) => return StepOutcome::Failed("malformed doxm payload"),
        }

        let token = self.issue_token();
        let request = OutboundRequest {
            token,
            uri: payload::secure_port_discovery_uri(),
            destination: Some(response.endpoint.clone()),
        };
        debug!(target: AMS_TARGET, endpoint = %response.endpoint, "AMS found, querying secure port");
        self.send(transport, request, DelegationStep::DiscoverSecurePort, false)
    }

    fn on_secure_port<T: AmsTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        response: &ClientResponse,
        ams_device_id: SubjectId,
        subject: &SubjectId,
        resource: &str,
    ) -> StepOutcome {
        let Some(ResponsePayload::Discovery(resources)) = &response.payload else {
            return StepOutcome::Failed("expected discovery payload");
        };
        let Some(first) = resources.first() else {
            return StepOutcome::Failed("empty discovery payload");
        };
        if first.device_id != ams_device_id {
            return StepOutcome::Failed("discovered resource belongs to another device");
        }
        if !first.secure || first.port == 0 {
            return StepOutcome::Failed("AMS exposes no secure port");
        }

        let token = self.issue_token();
        let request = OutboundRequest {
            token,
            uri: payload::acl_request_uri(subject, resource),
            destination: Some(response.endpoint.with_secure_port(first.port)),
        };
        debug!(target: AMS_TARGET, port = first.port, "requesting ACL from AMS");
        self.send(transport, request, DelegationStep::RequestAcl, true)
    }

    fn on_acl(response: &ClientResponse, ams_device_id: SubjectId) -> StepOutcome {
        if response.identity != Some(ams_device_id) {
            return StepOutcome::Failed("secure session did not authenticate the AMS");
        }
        let Some(ResponsePayload::Security(json)) = &response.payload else {
            return StepOutcome::Failed("expected acl payload");
        };
        match payload::parse_acl(json) {
            Ok(aces) => {
                info!(target: AMS_TARGET, count = aces.len(), "ACL received from AMS");
                StepOutcome::AclReceived(aces)
            }
            Err(_) => StepOutcome::Failed("malformed acl payload"),
        }
    }

    fn send<T: AmsTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        request: OutboundRequest,
        step: DelegationStep,
        unicast: bool,
    ) -> StepOutcome {
        let token = request.token;
        let sent = if unicast {
            transport.send_unicast(request)
        } else {
            transport.send_discovery(request)
        };
        match sent {
            Ok(()) => {
                self.pending = Some((step, token));
                StepOutcome::Continue
            }
            Err(_) => StepOutcome::Failed("request could not be sent"),
        }
    }

    fn issue_token(&mut self) -> RequestToken {
        self.next_token = self.next_token.wrapping_add(1);
        RequestToken(self.next_token)
    }

    /// Park the request that triggered the delegation
    pub fn capture(&mut self, request: CapturedRequest) {
        self.captured = Some(request);
    }

    /// Take the parked request, leaving none behind
    pub fn take_captured(&mut self) -> Option<CapturedRequest> {
        self.captured.take()
    }

    /// The parked request, if any
    #[must_use]
    pub fn captured(&self) -> Option<&CapturedRequest> {
        self.captured.as_ref()
    }

    /// Forget the delegation in flight, captured request included
    ///
    /// The token counter keeps running so completions of an abandoned
    /// delegation stay stale.
    pub fn reset(&mut self) {
        self.ams_device_id = None;
        self.pending = None;
        self.captured = None;
        self.started_at = None;
    }

    /// When the delegation in flight was started
    #[must_use]
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Step waiting for a completion
    #[must_use]
    pub fn pending_step(&self) -> Option<DelegationStep> {
        self.pending.map(|(step, _)| step)
    }

    /// Token of the request in flight
    #[must_use]
    pub fn pending_token(&self) -> Option<RequestToken> {
        self.pending.map(|(_, token)| token)
    }

    /// AMS the delegation in flight talks to
    #[must_use]
    pub fn ams_device_id(&self) -> Option<SubjectId> {
        self.ams_device_id
    }
}
