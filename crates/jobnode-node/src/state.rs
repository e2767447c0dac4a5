//! Shared node context.
//!
//! One instance per process, built at startup and handed to every
//! collaborator that needs job/node state, the ledger or the session scope.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use jobnode_core::{
    job_state_manager, node_state_manager, AbortScope, ActiveSession, CoreError, JobPhase,
    JobStateManager, NodeAddress, NodePhase, NodeStateManager, Payload, PhaseRecord, SessionGuard,
    TaskLedger,
};

use crate::auth::{Authorizer, SignerRegistry};
use crate::config::NodeConfig;

/// A phase transition from either register, as streamed to WebSocket clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum StateEvent {
    Job {
        phase: JobPhase,
        payload: Payload,
        timestamp: DateTime<Utc>,
    },
    Node {
        phase: NodePhase,
        payload: Payload,
        timestamp: DateTime<Utc>,
    },
}

impl From<&PhaseRecord<JobPhase>> for StateEvent {
    fn from(record: &PhaseRecord<JobPhase>) -> Self {
        Self::Job {
            phase: record.phase,
            payload: record.payload.clone(),
            timestamp: record.timestamp,
        }
    }
}

impl From<&PhaseRecord<NodePhase>> for StateEvent {
    fn from(record: &PhaseRecord<NodePhase>) -> Self {
        Self::Node {
            phase: record.phase,
            payload: record.payload.clone(),
            timestamp: record.timestamp,
        }
    }
}

pub struct NodeContext {
    pub config: NodeConfig,
    pub address: NodeAddress,
    pub job_state: Arc<JobStateManager>,
    pub node_state: Arc<NodeStateManager>,
    pub ledger: Arc<TaskLedger>,
    pub sessions: Arc<SessionGuard>,
    pub abort: AbortScope,
    pub authorizer: Authorizer,
    pub events: broadcast::Sender<StateEvent>,
}

impl NodeContext {
    /// Build a context with fresh registers, ledger and session guard.
    pub fn new(config: NodeConfig) -> Arc<Self> {
        Self::with_sessions(config, Arc::new(SessionGuard::new()))
    }

    /// Build a context sharing an existing session guard.
    pub fn with_sessions(config: NodeConfig, sessions: Arc<SessionGuard>) -> Arc<Self> {
        let job_state = Arc::new(job_state_manager());
        let node_state = Arc::new(node_state_manager());
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        // Send errors only mean nobody is listening.
        let tx = events.clone();
        job_state.subscribe(move |record| {
            let _ = tx.send(StateEvent::from(record));
        });
        let tx = events.clone();
        node_state.subscribe(move |record| {
            let _ = tx.send(StateEvent::from(record));
        });

        let registry = SignerRegistry::new(config.backend_signer.clone(), config.address.clone());
        let authorizer = Authorizer::new(config.auth_message.clone(), registry, job_state.clone());

        Arc::new(Self {
            address: NodeAddress::new(config.address.clone()),
            config,
            job_state,
            node_state,
            ledger: Arc::new(TaskLedger::new()),
            sessions,
            abort: AbortScope::new(),
            authorizer,
            events,
        })
    }

    /// Claim the node address for this process. Must succeed before any
    /// other session setup runs.
    pub fn begin_session(&self) -> Result<ActiveSession, CoreError> {
        self.sessions.begin(self.address.clone())
    }

    /// Tear down a session: free the address, rotate the abort scope and
    /// discard the session's ledger.
    pub fn end_session(&self, session: ActiveSession) {
        session.end();
        self.abort.rotate();
        let discarded = self.ledger.len();
        self.ledger.clear();
        info!(address = %self.address, discarded_operations = discarded, "session ended");
    }

    pub fn session_active(&self) -> bool {
        self.sessions.is_active(&self.address)
    }
}
