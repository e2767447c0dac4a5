//! Phase enums for the job and node lifecycles.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// A lifecycle phase that can be held by a [`StateRegister`](crate::StateRegister).
pub trait Phase: Copy + Eq + Debug + Serialize + Send + Sync + 'static {
    /// The phase a register starts in before any transition.
    fn none() -> Self;

    /// Stable wire name of the phase.
    fn as_str(&self) -> &'static str;
}

/// Phases of a job as it moves through a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    #[default]
    None,
    NodeStarting,
    NodeReady,
    RetrievingMarket,
    MarketRetrieved,
    RetrievingJobDefinition,
    JobDefinitionRetrieved,
    JobDefinitionValidated,
    JobStarted,
    FlowStarted,
    OperationStarted,
    OperationCompleted,
    OperationFailed,
    FlowCompleted,
    FlowFailed,
    IpfsUploading,
    IpfsUploaded,
    JobCompleted,
    JobStopped,
    JobFailed,
}

impl JobPhase {
    /// Returns true once the job can no longer make progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::JobCompleted | Self::JobStopped | Self::JobFailed)
    }
}

impl Phase for JobPhase {
    fn none() -> Self {
        Self::None
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::NodeStarting => "NODE_STARTING",
            Self::NodeReady => "NODE_READY",
            Self::RetrievingMarket => "RETRIEVING_MARKET",
            Self::MarketRetrieved => "MARKET_RETRIEVED",
            Self::RetrievingJobDefinition => "RETRIEVING_JOB_DEFINITION",
            Self::JobDefinitionRetrieved => "JOB_DEFINITION_RETRIEVED",
            Self::JobDefinitionValidated => "JOB_DEFINITION_VALIDATED",
            Self::JobStarted => "JOB_STARTED",
            Self::FlowStarted => "FLOW_STARTED",
            Self::OperationStarted => "OPERATION_STARTED",
            Self::OperationCompleted => "OPERATION_COMPLETED",
            Self::OperationFailed => "OPERATION_FAILED",
            Self::FlowCompleted => "FLOW_COMPLETED",
            Self::FlowFailed => "FLOW_FAILED",
            Self::IpfsUploading => "IPFS_UPLOADING",
            Self::IpfsUploaded => "IPFS_UPLOADED",
            Self::JobCompleted => "JOB_COMPLETED",
            Self::JobStopped => "JOB_STOPPED",
            Self::JobFailed => "JOB_FAILED",
        }
    }
}

/// Phases of the node process itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodePhase {
    #[default]
    None,
    Starting,
    Healthcheck,
    /// Ready and waiting for work.
    Idle,
    Queued,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl NodePhase {
    /// Returns true if the node can pick up a job.
    pub fn can_accept_jobs(&self) -> bool {
        matches!(self, Self::Idle | Self::Queued)
    }
}

impl Phase for NodePhase {
    fn none() -> Self {
        Self::None
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Starting => "STARTING",
            Self::Healthcheck => "HEALTHCHECK",
            Self::Idle => "IDLE",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Error => "ERROR",
        }
    }
}
