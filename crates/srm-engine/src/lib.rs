// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! # srm-engine
//!
//! Policy engine for the secure resource manager: the decision state
//! machine, the asynchronous delegation to a remote Access Management
//! Service (AMS) and the request gate that sits in front of resource
//! handlers.
//!
//! The engine performs no I/O and spawns no threads. Network steps of a
//! delegation are issued through an [`AmsTransport`] and return
//! immediately; the embedding transport layer later feeds the completion
//! back with [`PolicyEngine::handle_response`]. The final decision of a
//! delegated request is delivered to a [`ResponseSink`].
//!
//! ## Concurrency
//!
//! One engine holds exactly one in-flight decision. A request arriving
//! while the engine is `Busy` or parked in `AwaitingAmsResponse` is
//! rejected with `PolicyEngineError`, never queued. Embedders that need
//! several concurrent decisions run one engine per session, or route every
//! decision through a single task owning the engine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ams;
mod config;
mod engine;
mod error;
mod manager;
pub mod payload;
mod transport;

// Re-export main types
pub use ams::{AmsDelegate, DelegationStep, StepOutcome};
pub use config::EngineConfig;
pub use engine::{DecisionContext, EngineState, PolicyEngine};
pub use error::{EngineError, Result};
pub use manager::{is_security_resource_uri, SecureResourceManager};
pub use transport::{
    AmsTransport, CapturedRequest, ClientResponse, ConnType, DiscoveredResource, Disposition,
    Endpoint, OutboundRequest, OwnerProvider, RequestInfo, RequestToken, Resolution,
    ResponsePayload, ResponseSink, ResponseStatus,
};

/// Log target for decision state machine events
pub(crate) const PE_TARGET: &str = "srm::pe";
/// Log target for delegation protocol events
pub(crate) const AMS_TARGET: &str = "srm::ams";
/// Log target for the request gate
pub(crate) const GATE_TARGET: &str = "srm::gate";
