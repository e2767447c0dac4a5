//! HTTP request and response types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use jobnode_core::{JobPhase, NodePhase, OperationRecord, Payload};

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct NodeStateResponse {
    pub address: String,
    pub phase: NodePhase,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
    pub session_active: bool,
}

#[derive(Debug, Serialize)]
pub struct JobStateResponse {
    pub phase: JobPhase,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
    /// Allow-listed values promoted across phases.
    pub shared: Payload,
}

#[derive(Debug, Serialize)]
pub struct OperationsResponse {
    pub operations: Vec<OperationRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathValueResponse {
    pub operation_id: String,
    pub path: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub cancelled: bool,
}
