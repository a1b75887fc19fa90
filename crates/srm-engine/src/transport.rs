//! Collaborator interfaces and the transport-level value types they exchange
//!
//! The engine depends on three abstractions (DIP):
//!
//! - [`AmsTransport`]: issues discovery and unicast requests
//! - [`ResponseSink`]: answers a request whose decision was delegated
//! - [`OwnerProvider`]: reports the device owner
//!
//! Addresses, connectivity types and request metadata are plain values so
//! the engine can capture and replay them without owning any socket.

use core_identity::SubjectId;
use core_policy::{Decision, Method};
use std::fmt;

/// Connectivity type of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnType {
    /// Let the transport choose
    #[default]
    Default,
    /// IPv4
    Ipv4,
    /// IPv6
    Ipv6,
    /// Bluetooth LE GATT
    Gatt,
    /// Bluetooth RFCOMM
    Rfcomm,
}

/// Remote endpoint of a request or response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host address, in the transport's own textual form
    pub address: String,
    /// Port
    pub port: u16,
    /// True for an encrypted (DTLS) session
    pub secure: bool,
    /// Connectivity type
    pub conn: ConnType,
}

impl Endpoint {
    /// Plain endpoint with the default connectivity type
    #[must_use]
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            secure: false,
            conn: ConnType::Default,
        }
    }

    /// Same host, secure session on `port`
    #[must_use]
    pub fn with_secure_port(&self, port: u16) -> Self {
        Self {
            port,
            secure: true,
            ..self.clone()
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "coaps" } else { "coap" };
        write!(f, "{}://{}:{}", scheme, self.address, self.port)
    }
}

/// Inbound request metadata, as captured for replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    /// Authenticated requester (empty for anonymous sessions)
    pub subject: SubjectId,
    /// Request method
    pub method: Method,
    /// Request URI, query included
    pub uri: String,
    /// Transport token correlating request and reply
    pub token: Vec<u8>,
    /// Request body
    pub payload: Vec<u8>,
}

/// A request parked until its delegated decision resolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    /// Where the request came from
    pub endpoint: Endpoint,
    /// The request itself
    pub request: RequestInfo,
}

/// Correlates an outbound request with its completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(pub u64);

/// Request the engine asks the transport to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Token to hand back with the completion
    pub token: RequestToken,
    /// URI including query
    pub uri: String,
    /// Destination; `None` means multicast
    pub destination: Option<Endpoint>,
}

/// Status of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// 2.05 Content
    Ok,
    /// 2.01 Created
    Created,
    /// 2.04 Changed
    Changed,
    /// 4.01 Unauthorized
    Unauthorized,
    /// 4.04 Not Found
    NotFound,
    /// 5.00 Internal Server Error
    InternalError,
}

impl ResponseStatus {
    /// True for the 2.xx statuses
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Created | Self::Changed)
    }
}

/// One resource announced in a discovery reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredResource {
    /// Resource path
    pub uri: String,
    /// Device id of the announcing device
    pub device_id: SubjectId,
    /// True if the resource is reachable over a secure session
    pub secure: bool,
    /// Secure port, meaningful when `secure` is set
    pub port: u16,
}

/// Body of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    /// Security virtual resource document (JSON text)
    Security(String),
    /// Resource discovery reply
    Discovery(Vec<DiscoveredResource>),
}

impl ResponsePayload {
    /// Short name of the payload kind, for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Security(_) => "security",
            Self::Discovery(_) => "discovery",
        }
    }
}

/// Completion of an outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientResponse {
    /// Response status
    pub status: ResponseStatus,
    /// Identity authenticated by the secure session, if any
    pub identity: Option<SubjectId>,
    /// Responder endpoint
    pub endpoint: Endpoint,
    /// Response body
    pub payload: Option<ResponsePayload>,
}

/// Final outcome of a delegated decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Terminal decision
    pub decision: Decision,
    /// The request parked at delegation start, if one was captured
    pub request: Option<CapturedRequest>,
}

impl Resolution {
    /// What the transport should do with the captured request
    ///
    /// A granted request is forwarded to its resource handler; every
    /// denial is answered with `Unauthorized`. Without a captured request
    /// there is nobody to answer.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match (&self.request, self.decision) {
            (None, _) => Disposition::Dropped,
            (Some(_), Decision::Granted) => Disposition::Forward,
            (Some(_), _) => Disposition::Reject(ResponseStatus::Unauthorized),
        }
    }
}

/// What the transport layer does with an inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Hand the request to its resource handler
    Forward,
    /// Acknowledge now; the real reply follows once delegation resolves
    SlowResponse,
    /// Reply with this error status
    Reject(ResponseStatus),
    /// Discard silently
    Dropped,
}

/// Issues the network requests of a delegation
///
/// Both calls are fire-and-forget: they return once the request is queued.
/// The completion must later be passed to
/// [`crate::PolicyEngine::handle_response`] together with the request's
/// token, or with `None` if the request failed without a response.
pub trait AmsTransport {
    /// Discovery request, multicast when `destination` is `None`
    ///
    /// # Errors
    ///
    /// `EngineError::Transport` if the request could not be queued.
    fn send_discovery(&mut self, request: OutboundRequest) -> crate::Result<()>;

    /// Unicast request to `destination`
    ///
    /// # Errors
    ///
    /// `EngineError::Transport` if the request could not be queued.
    fn send_unicast(&mut self, request: OutboundRequest) -> crate::Result<()>;
}

/// Receives the final decision of every delegation
pub trait ResponseSink {
    /// Deliver a resolved delegation; see [`Resolution::disposition`]
    fn deliver(&mut self, resolution: Resolution);
}

/// Reports the device owner, who bypasses every ACL
pub trait OwnerProvider {
    /// Owner id, or `None` while the device is unowned
    fn owner_device_id(&self) -> Option<SubjectId>;
}

impl OwnerProvider for SubjectId {
    fn owner_device_id(&self) -> Option<SubjectId> {
        Some(*self)
    }
}

impl OwnerProvider for Option<SubjectId> {
    fn owner_device_id(&self) -> Option<SubjectId> {
        *self
    }
}
