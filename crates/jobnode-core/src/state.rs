//! Job and node state managers.
//!
//! Both are plain [`StateRegister`]s; they differ only in phase type and
//! allow-list. The node manager promotes nothing, so its shared data is
//! always empty and its payloads are visible to subscribers only.

use crate::phase::{JobPhase, NodePhase, Phase};
use crate::register::{SharedKeys, StateRegister};

/// Payload keys of job transitions that stay readable across phases.
pub const JOB_SHARED_KEYS: SharedKeys =
    SharedKeys::new(&["node", "job", "ipfs", "flow", "market", "operation"]);

pub type JobStateManager = StateRegister<JobPhase>;
pub type NodeStateManager = StateRegister<NodePhase>;

pub fn job_state_manager() -> JobStateManager {
    StateRegister::new(JobPhase::none(), JOB_SHARED_KEYS)
}

pub fn node_state_manager() -> NodeStateManager {
    StateRegister::new(NodePhase::none(), SharedKeys::none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::payload;
    use serde_json::json;

    #[test]
    fn test_job_manager_promotes_job_keys() {
        let jobs = job_state_manager();
        jobs.transition(
            JobPhase::JobStarted,
            payload(json!({ "job": "J", "other": "X", "flow": "F" })),
        );

        assert_eq!(jobs.shared("job"), Some(json!("J")));
        assert_eq!(jobs.shared("flow"), Some(json!("F")));
        assert_eq!(jobs.shared("other"), None);
    }

    #[test]
    fn test_node_manager_never_shares() {
        let nodes = node_state_manager();
        nodes.transition(
            NodePhase::Running,
            payload(json!({ "job": "J", "node": "N" })),
        );

        assert_eq!(nodes.shared("job"), None);
        assert_eq!(nodes.shared("node"), None);
        assert!(nodes.shared_snapshot().is_empty());
        assert_eq!(nodes.current().payload.get("job"), Some(&json!("J")));
    }

    #[test]
    fn test_managers_start_in_none() {
        assert_eq!(job_state_manager().phase(), JobPhase::None);
        assert_eq!(node_state_manager().phase(), NodePhase::None);
    }
}
