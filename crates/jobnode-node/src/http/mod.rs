//! HTTP/WS surface of the node.
//!
//! Provides endpoints for:
//! - Health check (`/health`) and Prometheus metrics (`/metrics`), public
//! - Node state (`/node/state`), backend only
//! - Job state and operation records (`/job/*`), node or job owner
//! - Result writes (`/job/operations/:op_id/results`), backend only
//! - State stream and actions over WebSocket (`/ws`)

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{authorize_request, RoleGate, SignerRole};
use crate::state::NodeContext;

pub mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<NodeContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let backend = Router::new()
        .route("/node/state", get(handlers::node_state))
        .route(
            "/job/operations/:op_id/results",
            post(handlers::set_operation_results),
        )
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(state.clone(), SignerRole::Backend),
            authorize_request,
        ));

    let owners = Router::new()
        .route("/job/state", get(handlers::job_state))
        .route("/job/stop", post(handlers::stop_job))
        .route("/job/operations", get(handlers::list_operations))
        .route("/job/operations/:op_id", get(handlers::get_operation))
        .route(
            "/job/operations/:op_id/path/:path",
            get(handlers::get_operation_path),
        )
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(state.clone(), SignerRole::NodeOrJobOwner),
            authorize_request,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/ws", get(handlers::ws_handler))
        .merge(backend)
        .merge(owners)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
