//! jobnode node process.
//!
//! Hosts one node session at a time and exposes its job state, node state
//! and operation ledger over an authenticated REST/WebSocket surface.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod job_source;
pub mod market_client;
pub mod metrics;
pub mod serve;
pub mod state;
pub mod wallet;

pub use config::NodeConfig;
pub use error::NodeError;
pub use http::create_router;
pub use market_client::{fetch_market, HttpMarketClient};
pub use serve::{parse_port, serve};
pub use state::{NodeContext, StateEvent};
