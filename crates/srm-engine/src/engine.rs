//! Decision state machine
//!
//! ```text
//!  Stopped --init--> AwaitingRequest --check--> Busy --local--> AwaitingRequest
//!                          ^                      |
//!                          |                  delegate
//!                          |                      v
//!                          +----resolved---- AwaitingAmsResponse
//! ```
//!
//! The engine owns exactly one [`DecisionContext`]. Local decisions finish
//! inside [`PolicyEngine::check_permission`]; delegated ones return
//! `WaitingForAms` and resolve later, through [`PolicyEngine::handle_response`]
//! or [`PolicyEngine::expire_delegation`], with the final decision delivered to
//! the [`ResponseSink`].

use crate::ams::{AmsDelegate, DelegationStep, StepOutcome};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::payload;
use crate::transport::{
    AmsTransport, CapturedRequest, ClientResponse, OwnerProvider, RequestToken, Resolution,
    ResponseSink,
};
use crate::PE_TARGET;
use core_identity::{SubjectId, EMPTY_SUBJECT_ID, WILDCARD_SUBJECT_ID};
use core_policy::{
    AccessControlEntry, AclEvaluator, AclStore, AmaclStore, Clock, Decision, Permission,
    TimeWindowValidator,
};
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a [`PolicyEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    /// Not initialised, or torn down
    #[default]
    Stopped,
    /// Ready for a request
    AwaitingRequest,
    /// Parked on a delegation
    AwaitingAmsResponse,
    /// Evaluating a request
    Busy,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Stopped => "stopped",
            Self::AwaitingRequest => "awaiting-request",
            Self::AwaitingAmsResponse => "awaiting-ams-response",
            Self::Busy => "busy",
        };
        f.write_str(text)
    }
}

/// The single in-flight decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionContext {
    subject: SubjectId,
    resource: String,
    permission: Permission,
    matching_acl_found: bool,
    ams_processing: bool,
    result: Decision,
}

impl Default for DecisionContext {
    fn default() -> Self {
        Self {
            subject: EMPTY_SUBJECT_ID,
            resource: String::new(),
            permission: Permission::empty(),
            matching_acl_found: false,
            ams_processing: false,
            result: Decision::ENGINE_ERROR,
        }
    }
}

impl DecisionContext {
    fn for_request(subject: &SubjectId, resource: &str, permission: Permission) -> Self {
        Self {
            subject: *subject,
            resource: resource.to_string(),
            permission,
            ..Self::default()
        }
    }

    /// Requesting subject
    #[must_use]
    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// Requested resource path
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Requested permission
    #[must_use]
    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// True once an ACE listed the resource
    #[must_use]
    pub fn matching_acl_found(&self) -> bool {
        self.matching_acl_found
    }

    /// True while this decision is delegated
    #[must_use]
    pub fn ams_processing(&self) -> bool {
        self.ams_processing
    }

    /// Latest result recorded for this decision
    #[must_use]
    pub fn result(&self) -> Decision {
        self.result
    }
}

/// Access-control decision engine
///
/// Generic over the transport used for delegation and the sink receiving
/// delegated decisions, so that tests and embedders plug in their own.
pub struct PolicyEngine<T, S> {
    config: EngineConfig,
    state: EngineState,
    context: DecisionContext,
    delegate: Option<AmsDelegate>,
    acl: AclStore,
    amacl: AmaclStore,
    owner: Box<dyn OwnerProvider>,
    clock: Box<dyn Clock>,
    validator: TimeWindowValidator,
    transport: T,
    sink: S,
}

impl<T: AmsTransport, S: ResponseSink> PolicyEngine<T, S> {
    /// Create a stopped engine with empty ACL and AMACL and no owner
    ///
    /// # Errors
    ///
    /// `EngineError::Config` if `config` fails validation.
    pub fn new(
        config: EngineConfig,
        transport: T,
        sink: S,
        clock: impl Clock + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let validator = if config.trusted_clock {
            TimeWindowValidator::new()
        } else {
            warn!(target: PE_TARGET, "clock not trusted, time windows will not be enforced");
            TimeWindowValidator::untrusted_clock()
        };

        Ok(Self {
            config,
            state: EngineState::Stopped,
            context: DecisionContext::default(),
            delegate: None,
            acl: AclStore::new(),
            amacl: AmaclStore::new(),
            owner: Box::new(None::<SubjectId>),
            clock: Box::new(clock),
            validator,
            transport,
            sink,
        })
    }

    /// Replace the ACL
    #[must_use]
    pub fn with_acl(mut self, acl: AclStore) -> Self {
        self.acl = acl;
        self
    }

    /// Replace the AMACL
    #[must_use]
    pub fn with_amacl(mut self, amacl: AmaclStore) -> Self {
        self.amacl = amacl;
        self
    }

    /// Set the owner collaborator
    #[must_use]
    pub fn with_owner(mut self, owner: impl OwnerProvider + 'static) -> Self {
        self.owner = Box::new(owner);
        self
    }

    /// Allocate the delegation context and start accepting requests
    ///
    /// # Errors
    ///
    /// `EngineError::InvalidState` unless the engine is stopped.
    pub fn init(&mut self) -> Result<()> {
        if self.state != EngineState::Stopped {
            return Err(EngineError::InvalidState {
                expected: EngineState::Stopped,
                found: self.state,
            });
        }
        self.delegate = Some(AmsDelegate::new());
        self.context = DecisionContext::default();
        self.state = EngineState::AwaitingRequest;
        info!(target: PE_TARGET, "policy engine started");
        Ok(())
    }

    /// Stop the engine and release the delegation context
    ///
    /// A parked delegation is resolved with `AmsServiceError` first.
    pub fn deinit(&mut self) {
        self.abort_delegation();
        self.context = DecisionContext::default();
        self.delegate = None;
        self.state = EngineState::Stopped;
        info!(target: PE_TARGET, "policy engine stopped");
    }

    /// Decide whether `subject` may access `resource` with `permission`
    ///
    /// Returns `WaitingForAms` when the decision was delegated; the final
    /// decision then arrives through the response sink. Any state other
    /// than `AwaitingRequest`, an empty resource or permission, or a
    /// resource longer than `max_uri_length` yields `PolicyEngineError`
    /// without touching the engine.
    pub fn check_permission(
        &mut self,
        subject: &SubjectId,
        resource: &str,
        permission: Permission,
    ) -> Decision {
        if self.state != EngineState::AwaitingRequest {
            warn!(target: PE_TARGET, state = %self.state, "request rejected, engine not ready");
            return Decision::ENGINE_ERROR;
        }
        if resource.is_empty() || permission.is_empty() {
            warn!(target: PE_TARGET, "request rejected, empty resource or permission");
            return Decision::ENGINE_ERROR;
        }
        if resource.len() > self.config.max_uri_length {
            warn!(
                target: PE_TARGET,
                length = resource.len(),
                max = self.config.max_uri_length,
                "request rejected, resource path too long"
            );
            return Decision::ENGINE_ERROR;
        }

        self.state = EngineState::Busy;
        self.context = DecisionContext::for_request(subject, resource, permission);
        debug!(target: PE_TARGET, %subject, resource, permission = permission.bits(), "evaluating");

        let decision = self.decide();
        self.context.result = decision;

        if decision == Decision::WaitingForAms {
            self.state = EngineState::AwaitingAmsResponse;
            info!(target: PE_TARGET, %subject, resource, "decision delegated to AMS");
        } else {
            info!(target: PE_TARGET, %subject, resource, %decision, "decision");
            self.context = DecisionContext::default();
            self.state = EngineState::AwaitingRequest;
        }
        decision
    }

    /// Owner bypass, local procedure, then delegation
    fn decide(&mut self) -> Decision {
        let subject = self.context.subject;
        let permission = self.context.permission;

        if let Some(owner) = self.owner.owner_device_id() {
            if !owner.is_empty() && owner == subject {
                debug!(target: PE_TARGET, "owner bypass");
                return Decision::Granted;
            }
        }

        let now = self.clock.now();
        let outcome = AclEvaluator::new(&self.acl, &self.validator).evaluate(
            &subject,
            &self.context.resource,
            permission,
            now,
        );
        self.context.matching_acl_found = outcome.matching_acl_found;

        if outcome.decision.is_granted() || self.context.ams_processing {
            return outcome.decision;
        }

        match self.amacl.ams_device_for(&self.context.resource) {
            Some(ams) if !ams.is_empty() => self.start_delegation(ams),
            _ => outcome.decision,
        }
    }

    fn start_delegation(&mut self, ams: SubjectId) -> Decision {
        self.context.ams_processing = true;
        let Some(delegate) = self.delegate.as_mut() else {
            error!(target: PE_TARGET, "delegation context missing");
            return Decision::ENGINE_ERROR;
        };
        match delegate.discover_ams(&mut self.transport, ams, Instant::now()) {
            Ok(()) => Decision::WaitingForAms,
            Err(e) => {
                warn!(target: PE_TARGET, error = %e, "delegation could not start");
                Decision::AMS_ERROR
            }
        }
    }

    /// Park the request that triggered the current delegation
    ///
    /// It is handed back to the sink together with the final decision.
    ///
    /// # Errors
    ///
    /// `EngineError::InvalidState` unless a delegation is parked.
    pub fn capture_request(&mut self, request: CapturedRequest) -> Result<()> {
        match (self.state, self.delegate.as_mut()) {
            (EngineState::AwaitingAmsResponse, Some(delegate)) => {
                delegate.capture(request);
                Ok(())
            }
            (found, _) => Err(EngineError::InvalidState {
                expected: EngineState::AwaitingAmsResponse,
                found,
            }),
        }
    }

    /// Feed the completion of delegation request `token`
    ///
    /// `response` is `None` when the transport gave up without a reply.
    /// Returns the final decision once the delegation resolves, `None`
    /// while it continues or when the completion is stale.
    pub fn handle_response(
        &mut self,
        token: RequestToken,
        response: Option<ClientResponse>,
    ) -> Option<Decision> {
        if self.state != EngineState::AwaitingAmsResponse {
            debug!(target: PE_TARGET, state = %self.state, "completion ignored, no delegation parked");
            return None;
        }
        // Anonymous requesters are asked about as the wildcard subject
        let subject = if self.context.subject.is_empty() {
            WILDCARD_SUBJECT_ID
        } else {
            self.context.subject
        };
        let delegate = self.delegate.as_mut()?;
        let outcome = delegate.handle_response(
            &mut self.transport,
            token,
            response.as_ref(),
            &subject,
            &self.context.resource,
        );

        let decision = match outcome {
            StepOutcome::Continue | StepOutcome::Stale => return None,
            StepOutcome::Failed(_) => Decision::AMS_ERROR,
            StepOutcome::AclReceived(aces) => self.install_delegated(aces),
        };
        Some(self.finalize(decision))
    }

    /// Merge the delegated ACEs and re-run the decision, which must grant
    fn install_delegated(&mut self, aces: Vec<AccessControlEntry>) -> Decision {
        if let Err(e) = self.acl.extend(aces) {
            warn!(target: PE_TARGET, error = %e, "delegated ACL rejected");
            return Decision::AMS_ERROR;
        }
        match self.decide() {
            Decision::Granted => Decision::Granted,
            other => {
                warn!(target: PE_TARGET, decision = %other, "delegated ACL does not authorize request");
                Decision::AMS_ERROR
            }
        }
    }

    /// Deliver the final decision of a delegation and reset for the next request
    fn finalize(&mut self, decision: Decision) -> Decision {
        let request = self.delegate.as_mut().and_then(|delegate| {
            let request = delegate.take_captured();
            delegate.reset();
            request
        });
        info!(
            target: PE_TARGET,
            subject = %self.context.subject,
            resource = %self.context.resource,
            %decision,
            "delegated decision"
        );
        self.sink.deliver(Resolution { decision, request });
        self.context = DecisionContext::default();
        self.state = EngineState::AwaitingRequest;
        decision
    }

    fn abort_delegation(&mut self) {
        let pending = self
            .delegate
            .as_ref()
            .is_some_and(|delegate| delegate.ams_device_id().is_some());
        if self.state == EngineState::AwaitingAmsResponse && pending {
            warn!(target: PE_TARGET, "aborting parked delegation");
            self.finalize(Decision::AMS_ERROR);
        }
    }

    /// Resolve a parked delegation that outlived the configured timeout
    ///
    /// Does nothing without `ams_response_timeout_secs`.
    pub fn expire_delegation(&mut self, now: Instant) -> Option<Decision> {
        let timeout = self.config.ams_response_timeout()?;
        if self.state != EngineState::AwaitingAmsResponse {
            return None;
        }
        let started_at = self.delegate.as_ref()?.started_at()?;
        if now.saturating_duration_since(started_at) < timeout {
            return None;
        }
        warn!(target: PE_TARGET, timeout_secs = timeout.as_secs(), "AMS did not answer in time");
        Some(self.finalize(Decision::AMS_ERROR))
    }

    /// Force the engine into `state`, clearing the decision context
    ///
    /// A parked delegation is resolved with `AmsServiceError` first.
    pub fn set_state(&mut self, state: EngineState) {
        self.abort_delegation();
        self.context = DecisionContext::default();
        debug!(target: PE_TARGET, from = %self.state, to = %state, "state forced");
        self.state = state;
    }

    /// Install an ACL document received out of band
    ///
    /// Returns the number of ACEs added. Nothing is added on error.
    ///
    /// # Errors
    ///
    /// `EngineError::Payload` or `EngineError::Policy` if the document or
    /// one of its ACEs is invalid, or if the store would overflow.
    pub fn install_acl(&mut self, json: &str) -> Result<usize> {
        let aces = payload::parse_acl(json)?;
        let count = aces.len();
        self.acl.extend(aces)?;
        info!(target: PE_TARGET, count, "ACL installed");
        Ok(count)
    }

    /// Remove ACEs of `subject`, or only `resource` from them
    ///
    /// # Errors
    ///
    /// `EngineError::Policy` when targeting the wildcard subject.
    pub fn remove_ace(&mut self, subject: &SubjectId, resource: Option<&str>) -> Result<usize> {
        let removed = self.acl.remove(subject, resource)?;
        info!(target: PE_TARGET, %subject, removed, "ACEs removed");
        Ok(removed)
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Current decision context
    #[must_use]
    pub fn context(&self) -> &DecisionContext {
        &self.context
    }

    /// Delegation step waiting for a completion
    #[must_use]
    pub fn pending_step(&self) -> Option<DelegationStep> {
        self.delegate.as_ref().and_then(AmsDelegate::pending_step)
    }

    /// Token of the delegation request in flight
    #[must_use]
    pub fn pending_token(&self) -> Option<RequestToken> {
        self.delegate.as_ref().and_then(AmsDelegate::pending_token)
    }

    /// When the parked delegation started
    #[must_use]
    pub fn delegation_started_at(&self) -> Option<Instant> {
        self.delegate.as_ref().and_then(AmsDelegate::started_at)
    }

    /// Local ACL
    #[must_use]
    pub fn acl(&self) -> &AclStore {
        &self.acl
    }

    /// Local AMACL
    #[must_use]
    pub fn amacl(&self) -> &AmaclStore {
        &self.amacl
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Delegation transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Delegation transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Response sink
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Response sink, mutably
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
