//! Operation record handlers backed by the task ledger.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::debug;

use jobnode_core::OperationId;

use crate::http::responses::{ErrorResponse, OperationsResponse, PathValueResponse};
use crate::state::NodeContext;

fn not_found(message: String) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse { error: message })).into_response()
}

/// GET /job/operations
pub async fn list_operations(State(state): State<Arc<NodeContext>>) -> impl IntoResponse {
    Json(OperationsResponse {
        operations: state.ledger.snapshot(),
    })
}

/// GET /job/operations/:op_id
pub async fn get_operation(
    State(state): State<Arc<NodeContext>>,
    Path(op_id): Path<String>,
) -> Response {
    match state.ledger.get(&OperationId::new(&op_id)) {
        Some(record) => Json(record).into_response(),
        None => not_found(format!("Operation not found: {op_id}")),
    }
}

/// GET /job/operations/:op_id/path/:path
pub async fn get_operation_path(
    State(state): State<Arc<NodeContext>>,
    Path((op_id, path)): Path<(String, String)>,
) -> Response {
    match state.ledger.get_by_path(&OperationId::new(&op_id), &path) {
        Some(value) => Json(PathValueResponse {
            operation_id: op_id,
            path,
            value,
        })
        .into_response(),
        None => not_found(format!("No value at '{path}' for operation {op_id}")),
    }
}

/// POST /job/operations/:op_id/results
///
/// Body must be a JSON object; its keys are merged into the results.
pub async fn set_operation_results(
    State(state): State<Arc<NodeContext>>,
    Path(op_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Value::Object(values) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "results must be a JSON object".to_string(),
            }),
        )
            .into_response();
    };

    let operation_id = OperationId::new(&op_id);
    debug!(operation_id = %operation_id, keys = values.len(), "merging results");
    state.ledger.set_results(&operation_id, values);

    match state.ledger.get(&operation_id) {
        Some(record) => Json(record).into_response(),
        None => not_found(format!("Operation not found: {op_id}")),
    }
}
