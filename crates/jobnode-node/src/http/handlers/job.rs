//! Job state and control handlers.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Extension, Json};
use tracing::info;

use crate::auth::VerifiedSigner;
use crate::http::responses::{JobStateResponse, StopResponse};
use crate::state::NodeContext;

pub(crate) fn job_state_response(state: &NodeContext) -> JobStateResponse {
    let record = state.job_state.current();
    JobStateResponse {
        phase: record.phase,
        payload: record.payload,
        timestamp: record.timestamp,
        shared: state.job_state.shared_snapshot(),
    }
}

/// GET /job/state
pub async fn job_state(State(state): State<Arc<NodeContext>>) -> impl IntoResponse {
    Json(job_state_response(&state))
}

/// Cancel the current abort token. Operations started under an earlier,
/// already rotated token are unaffected.
pub(crate) fn stop_current_job(state: &NodeContext, signer: &VerifiedSigner) -> bool {
    let cancelled = state.abort.cancel_current();
    info!(signer = %signer.address, cancelled, "job stop requested");
    cancelled
}

/// POST /job/stop
pub async fn stop_job(
    State(state): State<Arc<NodeContext>>,
    Extension(signer): Extension<VerifiedSigner>,
) -> impl IntoResponse {
    Json(StopResponse {
        cancelled: stop_current_job(&state, &signer),
    })
}
