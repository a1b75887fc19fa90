//! Mock collaborators shared by the engine integration tests

#![allow(dead_code)]

use chrono::NaiveDateTime;
use core_identity::SubjectId;
use core_policy::calendar::parse_date_time;
use core_policy::{AccessControlEntry, AclStore, AmaclEntry, AmaclStore, FixedClock};
use srm_engine::payload;
use srm_engine::{
    AmsTransport, ClientResponse, DiscoveredResource, EngineConfig, EngineError, Endpoint,
    OutboundRequest, PolicyEngine, Resolution, ResponsePayload, ResponseSink, ResponseStatus,
};

/// One request handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub unicast: bool,
    pub request: OutboundRequest,
}

/// Records every request; can be told to refuse them
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<Sent>,
    pub offline: bool,
}

impl RecordingTransport {
    fn record(&mut self, unicast: bool, request: OutboundRequest) -> srm_engine::Result<()> {
        if self.offline {
            return Err(EngineError::Transport("network unreachable".into()));
        }
        self.sent.push(Sent { unicast, request });
        Ok(())
    }

    pub fn last(&self) -> &Sent {
        self.sent.last().expect("nothing was sent")
    }
}

impl AmsTransport for RecordingTransport {
    fn send_discovery(&mut self, request: OutboundRequest) -> srm_engine::Result<()> {
        self.record(false, request)
    }

    fn send_unicast(&mut self, request: OutboundRequest) -> srm_engine::Result<()> {
        self.record(true, request)
    }
}

/// Records every delivered resolution
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub delivered: Vec<Resolution>,
}

impl ResponseSink for RecordingSink {
    fn deliver(&mut self, resolution: Resolution) {
        self.delivered.push(resolution);
    }
}

pub type TestEngine = PolicyEngine<RecordingTransport, RecordingSink>;

pub fn alice() -> SubjectId {
    SubjectId::from_bytes([0xa1; 16])
}

pub fn bob() -> SubjectId {
    SubjectId::from_bytes([0xb0; 16])
}

pub fn owner() -> SubjectId {
    SubjectId::from_bytes([0x0e; 16])
}

pub fn ams_id() -> SubjectId {
    SubjectId::from_bytes([0xa5; 16])
}

pub fn impostor() -> SubjectId {
    SubjectId::from_bytes([0x5a; 16])
}

/// Monday 2025-06-02, 12:00:00
pub fn noon() -> NaiveDateTime {
    parse_date_time("20250602T120000").unwrap()
}

pub fn ams_endpoint() -> Endpoint {
    Endpoint::new("192.168.1.20", 5683)
}

/// AMACL sending every `/a/` resource to [`ams_id`]
pub fn amacl_for_ams() -> AmaclStore {
    AmaclStore::from_entries(vec![AmaclEntry::new(vec!["/a/".into()], vec![ams_id()])]).unwrap()
}

pub fn engine_with_config(config: EngineConfig, acl: AclStore, amacl: AmaclStore) -> TestEngine {
    let mut engine = PolicyEngine::new(
        config,
        RecordingTransport::default(),
        RecordingSink::default(),
        FixedClock(noon()),
    )
    .unwrap()
    .with_acl(acl)
    .with_amacl(amacl)
    .with_owner(owner());
    engine.init().unwrap();
    engine
}

pub fn engine(acl: AclStore, amacl: AmaclStore) -> TestEngine {
    engine_with_config(EngineConfig::default(), acl, amacl)
}

/// Reply to the multicast AMS discovery
pub fn doxm_reply(device: SubjectId) -> ClientResponse {
    ClientResponse {
        status: ResponseStatus::Ok,
        identity: None,
        endpoint: ams_endpoint(),
        payload: Some(ResponsePayload::Security(
            payload::encode_doxm(&device, None).unwrap(),
        )),
    }
}

/// Reply to the secure port discovery
pub fn port_reply(device: SubjectId, port: u16) -> ClientResponse {
    ClientResponse {
        status: ResponseStatus::Ok,
        identity: None,
        endpoint: ams_endpoint(),
        payload: Some(ResponsePayload::Discovery(vec![DiscoveredResource {
            uri: payload::DOXM_URI.to_string(),
            device_id: device,
            secure: true,
            port,
        }])),
    }
}

/// Reply to the ACL request, authenticated as `identity`
pub fn acl_reply(identity: SubjectId, aces: &[AccessControlEntry]) -> ClientResponse {
    ClientResponse {
        status: ResponseStatus::Ok,
        identity: Some(identity),
        endpoint: ams_endpoint().with_secure_port(5684),
        payload: Some(ResponsePayload::Security(payload::encode_acl(aces).unwrap())),
    }
}

/// Feed `response` to whatever step is in flight
pub fn complete(engine: &mut TestEngine, response: ClientResponse) -> Option<core_policy::Decision> {
    let token = engine.pending_token().expect("no delegation step in flight");
    engine.handle_response(token, Some(response))
}
