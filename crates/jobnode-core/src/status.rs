//! Status of an operation within a job.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a single operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Record exists but the operation has not been scheduled.
    #[default]
    Init,
    /// Scheduled, waiting on a dependency or a resource.
    Pending,
    Running,
    Success,
    Failed,
    /// Stopped through the abort scope before finishing.
    Stopped,
}

impl OperationStatus {
    pub const ALL: [OperationStatus; 6] = [
        Self::Init,
        Self::Pending,
        Self::Running,
        Self::Success,
        Self::Failed,
        Self::Stopped,
    ];

    /// Returns true if the operation has finished, one way or another.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(OperationStatus::Success.is_terminal());
        assert!(OperationStatus::Stopped.is_terminal());
        assert!(!OperationStatus::Running.is_terminal());
        assert!(!OperationStatus::Init.is_terminal());
    }

    #[test]
    fn test_as_str_matches_serde() {
        for status in OperationStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
