//! Prometheus metrics collection and formatting.

use std::fmt::Write;

use jobnode_core::{NodePhase, OperationStatus, Phase};

use crate::state::NodeContext;

/// Collect node metrics in Prometheus text exposition format.
pub fn collect_metrics(ctx: &NodeContext) -> String {
    let mut output = String::new();

    collect_operation_metrics(ctx, &mut output);
    collect_node_metrics(ctx, &mut output);

    output
}

fn collect_operation_metrics(ctx: &NodeContext, output: &mut String) {
    let counts = ctx.ledger.status_counts();

    writeln!(
        output,
        "# HELP jobnode_operations Operations in the current session by status"
    )
    .ok();
    writeln!(output, "# TYPE jobnode_operations gauge").ok();
    for status in OperationStatus::ALL {
        let count = counts.get(&status).copied().unwrap_or(0);
        writeln!(
            output,
            "jobnode_operations{{status=\"{}\"}} {count}",
            status.as_str()
        )
        .ok();
    }
}

fn collect_node_metrics(ctx: &NodeContext, output: &mut String) {
    let phase = ctx.node_state.phase();

    writeln!(output).ok();
    writeln!(output, "# HELP jobnode_node_phase Current node phase (1 = active)").ok();
    writeln!(output, "# TYPE jobnode_node_phase gauge").ok();
    for candidate in [
        NodePhase::None,
        NodePhase::Starting,
        NodePhase::Healthcheck,
        NodePhase::Idle,
        NodePhase::Queued,
        NodePhase::Running,
        NodePhase::Stopping,
        NodePhase::Stopped,
        NodePhase::Error,
    ] {
        let value = u8::from(candidate == phase);
        writeln!(
            output,
            "jobnode_node_phase{{phase=\"{}\"}} {value}",
            candidate.as_str()
        )
        .ok();
    }

    writeln!(output).ok();
    writeln!(output, "# HELP jobnode_session_active Whether a node session is active").ok();
    writeln!(output, "# TYPE jobnode_session_active gauge").ok();
    writeln!(output, "jobnode_session_active {}", u8::from(ctx.session_active())).ok();

    writeln!(output).ok();
    writeln!(output, "# HELP jobnode_event_subscribers Live state event subscribers").ok();
    writeln!(output, "# TYPE jobnode_event_subscribers gauge").ok();
    writeln!(output, "jobnode_event_subscribers {}", ctx.events.receiver_count()).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use jobnode_core::OperationId;

    #[test]
    fn test_collect_metrics_empty_state() {
        let ctx = NodeContext::new(NodeConfig::default());
        let output = collect_metrics(&ctx);

        assert!(output.contains("jobnode_operations{status=\"init\"} 0"));
        assert!(output.contains("jobnode_node_phase{phase=\"NONE\"} 1"));
        assert!(output.contains("jobnode_node_phase{phase=\"IDLE\"} 0"));
        assert!(output.contains("jobnode_session_active 0"));
    }

    #[test]
    fn test_operation_counts() {
        let ctx = NodeContext::new(NodeConfig::default());
        ctx.ledger.start(&OperationId::new("a"));
        ctx.ledger.start(&OperationId::new("b"));
        ctx.ledger.set_host(&OperationId::new("c"), "h");

        let output = collect_metrics(&ctx);
        assert!(output.contains("jobnode_operations{status=\"running\"} 2"));
        assert!(output.contains("jobnode_operations{status=\"init\"} 1"));
    }
}
