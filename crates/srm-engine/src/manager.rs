//! Request gate in front of the resource handlers
//!
//! Every inbound request passes through [`SecureResourceManager::handle_request`],
//! which asks the engine for a decision and tells the transport what to do
//! with the request.

use crate::engine::{EngineState, PolicyEngine};
use crate::payload::strip_query;
use crate::transport::{
    AmsTransport, CapturedRequest, ClientResponse, Disposition, Endpoint, RequestInfo,
    RequestToken, ResponseSink, ResponseStatus,
};
use crate::GATE_TARGET;
use core_policy::{Decision, Permission};
use tracing::{debug, error, info, warn};

/// Security virtual resources, matched on the path only
const SECURITY_RESOURCE_URIS: [&str; 7] = [
    "/oic/sec/svc",
    "/oic/sec/amacl",
    "/oic/sec/crl",
    "/oic/sec/cred",
    "/oic/sec/acl",
    "/oic/sec/doxm",
    "/oic/sec/pstat",
];

/// True if `uri` names one of the security virtual resources
#[must_use]
pub fn is_security_resource_uri(uri: &str) -> bool {
    let path = strip_query(uri);
    SECURITY_RESOURCE_URIS.contains(&path)
}

/// Gate owning the policy engine of one node
pub struct SecureResourceManager<T, S> {
    engine: PolicyEngine<T, S>,
}

impl<T: AmsTransport, S: ResponseSink> SecureResourceManager<T, S> {
    /// Wrap an engine; it is initialised if still stopped
    ///
    /// # Errors
    ///
    /// Propagates the engine's init error.
    pub fn new(mut engine: PolicyEngine<T, S>) -> crate::Result<Self> {
        if engine.state() == EngineState::Stopped {
            engine.init()?;
        }
        Ok(Self { engine })
    }

    /// Decide what happens to an inbound request
    pub fn handle_request(&mut self, endpoint: &Endpoint, request: &RequestInfo) -> Disposition {
        let resource = strip_query(&request.uri);
        let max = self.engine.config().max_uri_length;
        if resource.len() > max {
            error!(target: GATE_TARGET, length = resource.len(), max, "incorrect URI length");
            return Disposition::Dropped;
        }

        if self.engine.state() != EngineState::AwaitingRequest {
            info!(
                target: GATE_TARGET,
                state = %self.engine.state(),
                uri = %request.uri,
                method = %request.method,
                "engine not ready, rejecting request"
            );
            return Disposition::Reject(ResponseStatus::Unauthorized);
        }

        debug!(target: GATE_TARGET, uri = %request.uri, method = %request.method, %endpoint, "processing request");
        let permission = Permission::from_method(request.method);
        let decision = self
            .engine
            .check_permission(&request.subject, resource, permission);

        match decision {
            Decision::Granted => Disposition::Forward,
            Decision::WaitingForAms => {
                let captured = CapturedRequest {
                    endpoint: endpoint.clone(),
                    request: request.clone(),
                };
                if let Err(e) = self.engine.capture_request(captured) {
                    error!(target: GATE_TARGET, error = %e, "could not park request");
                    return Disposition::Reject(ResponseStatus::Unauthorized);
                }
                info!(target: GATE_TARGET, "sending slow response");
                Disposition::SlowResponse
            }
            Decision::Denied(reason) => {
                warn!(target: GATE_TARGET, %reason, uri = %request.uri, "access denied");
                Disposition::Reject(ResponseStatus::Unauthorized)
            }
        }
    }

    /// Feed a delegation completion to the engine
    pub fn handle_response(
        &mut self,
        token: RequestToken,
        response: Option<ClientResponse>,
    ) -> Option<Decision> {
        self.engine.handle_response(token, response)
    }

    /// The wrapped engine
    #[must_use]
    pub fn engine(&self) -> &PolicyEngine<T, S> {
        &self.engine
    }

    /// The wrapped engine, mutably
    pub fn engine_mut(&mut self) -> &mut PolicyEngine<T, S> {
        &mut self.engine
    }

    /// Stop the engine and give it back
    #[must_use]
    pub fn into_engine(mut self) -> PolicyEngine<T, S> {
        self.engine.deinit();
        self.engine
    }
}
