//! Security virtual resource URIs and JSON documents
//!
//! Only the two documents a delegation needs are handled here: the
//! device ownership transfer record (`/oic/sec/doxm`) used to authenticate
//! the AMS during discovery, and the ACL document returned by the AMS.

use crate::error::{EngineError, Result};
use core_identity::SubjectId;
use core_policy::AccessControlEntry;
use serde::{Deserialize, Serialize};

/// Device ownership transfer resource
pub const DOXM_URI: &str = "/oic/sec/doxm";
/// Access control list resource
pub const ACL_URI: &str = "/oic/sec/acl";
/// Well-known resource directory
pub const WELL_KNOWN_URI: &str = "/oic/res";
/// Resource type of the ownership transfer resource
pub const DOXM_RESOURCE_TYPE: &str = "oic.sec.doxm";

/// Multicast query that only the device with `device_id` answers
#[must_use]
pub fn doxm_discovery_uri(device_id: &SubjectId) -> String {
    format!("{}?deviceid={}", DOXM_URI, device_id.to_base64())
}

/// Unicast query that reveals the secure port of the doxm resource
#[must_use]
pub fn secure_port_discovery_uri() -> String {
    format!("{}?rt={}", WELL_KNOWN_URI, DOXM_RESOURCE_TYPE)
}

/// ACL request asking the AMS about `subject` on `resource`
#[must_use]
pub fn acl_request_uri(subject: &SubjectId, resource: &str) -> String {
    format!("{}?sub={};rsrc={}", ACL_URI, subject.to_base64(), resource)
}

/// Path component of `uri`, everything before the first `?`
#[must_use]
pub fn strip_query(uri: &str) -> &str {
    uri.split_once('?').map_or(uri, |(path, _)| path)
}

#[derive(Debug, Serialize, Deserialize)]
struct DoxmDocument {
    doxm: Doxm,
}

#[derive(Debug, Serialize, Deserialize)]
struct Doxm {
    #[serde(rename = "deviceid")]
    device_id: SubjectId,
    #[serde(default)]
    owned: bool,
    #[serde(rename = "ownr", default, skip_serializing_if = "Option::is_none")]
    owner: Option<SubjectId>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AclDocument {
    acl: Vec<AccessControlEntry>,
}

/// Device id announced by a doxm document
///
/// # Errors
///
/// `EngineError::Payload` if the JSON is malformed or has no device id.
pub fn parse_doxm(json: &str) -> Result<SubjectId> {
    let document: DoxmDocument = serde_json::from_str(json)
        .map_err(|e| EngineError::Payload(format!("doxm: {}", e)))?;
    Ok(document.doxm.device_id)
}

/// Encode a doxm document
///
/// # Errors
///
/// `EngineError::Payload` if serialization fails.
pub fn encode_doxm(device_id: &SubjectId, owner: Option<&SubjectId>) -> Result<String> {
    let document = DoxmDocument {
        doxm: Doxm {
            device_id: *device_id,
            owned: owner.is_some(),
            owner: owner.copied(),
        },
    };
    serde_json::to_string(&document).map_err(|e| EngineError::Payload(format!("doxm: {}", e)))
}

/// ACEs carried by an ACL document
///
/// Every ACE is validated; one bad entry rejects the whole document.
///
/// # Errors
///
/// - `EngineError::Payload` if the JSON is malformed
/// - `EngineError::Policy` if an ACE fails validation
pub fn parse_acl(json: &str) -> Result<Vec<AccessControlEntry>> {
    let document: AclDocument =
        serde_json::from_str(json).map_err(|e| EngineError::Payload(format!("acl: {}", e)))?;
    for ace in &document.acl {
        ace.validate()?;
    }
    Ok(document.acl)
}

/// Encode ACEs as an ACL document
///
/// # Errors
///
/// `EngineError::Payload` if serialization fails.
pub fn encode_acl(aces: &[AccessControlEntry]) -> Result<String> {
    let document = AclDocument { acl: aces.to_vec() };
    serde_json::to_string(&document).map_err(|e| EngineError::Payload(format!("acl: {}", e)))
}
