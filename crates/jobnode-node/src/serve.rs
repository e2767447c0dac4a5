//! Session serve loop: claim the node address, expose the router, tear down.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use jobnode_core::{payload, ActiveSession, JobPhase, NodePhase, Payload, SessionGuard};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::http::create_router;
use crate::state::NodeContext;
use crate::wallet::check_wallet;

/// Parse a CLI port argument.
pub fn parse_port(raw: &str) -> Result<u16, NodeError> {
    raw.trim()
        .parse()
        .map_err(|_| NodeError::InvalidPort(raw.to_string()))
}

/// Run one node session on `port` until ctrl-c.
///
/// `sessions` is the process-wide guard; a second call for an address that
/// is already serving fails with `NodeAlreadyActive` before anything starts.
pub async fn serve(
    config: NodeConfig,
    port: u16,
    sessions: Arc<SessionGuard>,
) -> Result<(), NodeError> {
    let (ctx, session) = start_session(config, sessions)?;

    let addr = format!("{}:{}", ctx.config.host, port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "failed to bind");
            ctx.node_state.transition(NodePhase::Error, payload(json!({ "error": e.to_string() })));
            ctx.end_session(session);
            return Err(e.into());
        }
    };

    run_session(ctx, session, listener, shutdown_signal()).await
}

/// Check the wallet, build the context and claim the node address.
///
/// Nothing after the wallet check runs if the address is already active,
/// so a rejected session leaves no registers touched.
pub fn start_session(
    config: NodeConfig,
    sessions: Arc<SessionGuard>,
) -> Result<(Arc<NodeContext>, ActiveSession), NodeError> {
    check_wallet(&config)?;

    let ctx = NodeContext::with_sessions(config, sessions);
    let session = ctx.begin_session()?;
    info!(address = %ctx.address, "session started");

    ctx.node_state.transition(NodePhase::Starting, Payload::new());
    ctx.node_state.transition(NodePhase::Idle, Payload::new());
    ctx.job_state.transition(
        JobPhase::NodeReady,
        payload(json!({ "node": ctx.address.as_str() })),
    );

    Ok((ctx, session))
}

/// Serve the router on `listener` until `shutdown` resolves, then end the session.
pub async fn run_session<F>(
    ctx: Arc<NodeContext>,
    session: ActiveSession,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), NodeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr()?;
    info!(addr = %local, "HTTP server listening");

    let result = axum::serve(listener, create_router(ctx.clone()))
        .with_graceful_shutdown(shutdown)
        .await;
    if let Err(e) = &result {
        error!(error = %e, "HTTP server error");
    }

    ctx.node_state.transition(NodePhase::Stopping, Payload::new());
    ctx.end_session(session);
    ctx.node_state.transition(NodePhase::Stopped, Payload::new());

    result.map_err(NodeError::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobnode_core::{CoreError, NodeAddress, OperationId};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn config() -> NodeConfig {
        NodeConfig {
            address: "cd".repeat(32),
            host: "127.0.0.1".to_string(),
            ..NodeConfig::default()
        }
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("8080").unwrap(), 8080);
        assert_eq!(parse_port(" 3000 ").unwrap(), 3000);
        assert!(matches!(parse_port("http"), Err(NodeError::InvalidPort(p)) if p == "http"));
        assert!(parse_port("70000").is_err());
    }

    #[test]
    fn test_start_session_publishes_ready() {
        let (ctx, _session) = start_session(config(), Arc::new(SessionGuard::new())).unwrap();

        assert_eq!(ctx.node_state.phase(), NodePhase::Idle);
        let job = ctx.job_state.current();
        assert_eq!(job.phase, JobPhase::NodeReady);
        assert_eq!(job.payload.get("node"), Some(&json!("cd".repeat(32))));
        assert_eq!(ctx.job_state.shared("node"), Some(json!("cd".repeat(32))));
        assert!(ctx.session_active());
    }

    #[test]
    fn test_duplicate_session_stops_early() {
        let sessions = Arc::new(SessionGuard::new());
        let (_ctx, _session) = start_session(config(), sessions.clone()).unwrap();

        let Err(err) = start_session(config(), sessions) else {
            panic!("second session for the same address started");
        };
        assert!(matches!(err, NodeError::Core(_)));
        assert_eq!(
            err.to_string(),
            format!("Node already active for address {}", "cd".repeat(32))
        );
    }

    #[tokio::test]
    async fn test_second_serve_for_same_address_rejected() {
        let sessions = Arc::new(SessionGuard::new());
        let address = NodeAddress::new("cd".repeat(32));

        let first = tokio::spawn(serve(config(), 0, sessions.clone()));
        while !sessions.is_active(&address) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let second = tokio::time::timeout(
            Duration::from_secs(5),
            serve(config(), 0, sessions.clone()),
        )
        .await
        .expect("second serve returned promptly");
        assert!(matches!(
            second,
            Err(NodeError::Core(CoreError::NodeAlreadyActive(ref a))) if *a == address
        ));
        assert!(!first.is_finished());

        first.abort();
        let _ = first.await;
        assert!(!sessions.is_active(&address));
    }

    #[tokio::test]
    async fn test_run_session_serves_then_tears_down() {
        let (ctx, session) = start_session(config(), Arc::new(SessionGuard::new())).unwrap();
        ctx.ledger.start(&OperationId::new("op"));
        let token = ctx.abort.current();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(run_session(ctx.clone(), session, listener, async {
            let _ = rx.await;
        }));

        let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({ "status": "ok" }));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();

        assert_eq!(ctx.node_state.phase(), NodePhase::Stopped);
        assert!(!ctx.session_active());
        assert!(ctx.ledger.is_empty());
        assert!(!token.is_cancelled());
    }
}
