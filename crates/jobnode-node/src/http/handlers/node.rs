//! Node state handler.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use crate::http::responses::NodeStateResponse;
use crate::state::NodeContext;

/// GET /node/state
pub async fn node_state(State(state): State<Arc<NodeContext>>) -> impl IntoResponse {
    let record = state.node_state.current();
    Json(NodeStateResponse {
        address: state.address.to_string(),
        phase: record.phase,
        payload: record.payload,
        timestamp: record.timestamp,
        session_active: state.session_active(),
    })
}
