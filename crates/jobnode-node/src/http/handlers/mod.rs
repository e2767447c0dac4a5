//! HTTP request handlers.

mod health;
mod job;
mod node;
mod operations;
pub mod ws;

pub use health::{health_check, metrics_handler};
pub use job::{job_state, stop_job};
pub use node::node_state;
pub use operations::{get_operation, get_operation_path, list_operations, set_operation_results};
pub use ws::ws_handler;
