//! jobnode core domain
//!
//! Execution-and-state core of a compute node:
//! - observable state registers for job and node lifecycles
//! - the per-operation task ledger
//! - session guard and rotating abort scope
//!
//! Nothing here touches the network or a specific runtime.

pub mod error;
pub mod health;
pub mod ids;
pub mod job;
pub mod ledger;
pub mod market;
pub mod phase;
pub mod register;
pub mod session;
pub mod state;
pub mod status;
pub mod volume;
pub mod wallet;

// Re-export commonly used types
pub use error::CoreError;
pub use health::{HealthCheck, Port};
pub use ids::{NodeAddress, OperationId};
pub use job::{JobDefinition, OperationDefinition, ValidationIssue};
pub use ledger::{OperationRecord, TaskLedger};
pub use market::{BoxError, Market, MarketSource};
pub use phase::{JobPhase, NodePhase, Phase};
pub use register::{payload, Payload, PhaseRecord, SharedKeys, StateRegister, SubscriptionId};
pub use session::{AbortScope, AbortToken, ActiveSession, SessionGuard};
pub use state::{job_state_manager, node_state_manager, JobStateManager, NodeStateManager, JOB_SHARED_KEYS};
pub use status::OperationStatus;
pub use volume::{has_docker_volume, VolumeInfo};
