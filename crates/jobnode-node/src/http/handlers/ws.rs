//! WebSocket handler: state stream plus authenticated actions.
//!
//! Connection-scoped auth comes from the `signer`, `message` and `signature`
//! query parameters on upgrade. Privileged actions (`stop_job`) carry their
//! own credentials and are verified per message, whatever the connection is.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use jobnode_core::{JobPhase, OperationId, OperationRecord, Payload};

use crate::auth::{AuthError, Credentials, SignerRole, VerifiedSigner};
use crate::state::{NodeContext, StateEvent};

use super::job::{job_state_response, stop_current_job};

/// Credentials presented on upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct WsAuthQuery {
    pub signer: Option<String>,
    pub message: Option<String>,
    pub signature: Option<String>,
}

impl WsAuthQuery {
    /// `None` when no credentials were offered at all.
    fn credentials(self) -> Option<Result<Credentials, AuthError>> {
        if self.signer.is_none() && self.message.is_none() && self.signature.is_none() {
            return None;
        }
        Some(credentials(self.signer, self.message, self.signature))
    }
}

fn credentials(
    signer: Option<String>,
    message: Option<String>,
    signature: Option<String>,
) -> Result<Credentials, AuthError> {
    match (signer, message, signature) {
        (Some(signer), Some(message), Some(signature)) => Ok(Credentials {
            signer,
            message,
            signature,
        }),
        _ => Err(AuthError::MissingCredentials),
    }
}

/// Messages a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    /// Start streaming state events on this connection.
    Subscribe,
    JobState,
    Operation {
        operation_id: String,
    },
    StopJob {
        signer: Option<String>,
        message: Option<String>,
        signature: Option<String>,
    },
}

/// Messages the node sends back.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Pong,
    Subscribed,
    JobState {
        phase: JobPhase,
        payload: Payload,
        timestamp: DateTime<Utc>,
        shared: Payload,
    },
    Operation {
        operation_id: String,
        record: Option<OperationRecord>,
    },
    JobStopped {
        cancelled: bool,
    },
    Event {
        event: StateEvent,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl ServerMessage {
    fn unauthorized(error: &AuthError) -> Self {
        Self::Error {
            code: "unauthorized",
            message: error.to_string(),
        }
    }
}

/// WebSocket upgrade handler.
///
/// Credentials that are offered but fail verification reject the upgrade;
/// no credentials leave the connection anonymous.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<NodeContext>>,
    Query(query): Query<WsAuthQuery>,
) -> Response {
    let connection = match authenticate_connection(&state, query) {
        Ok(connection) => connection,
        Err(e) => {
            warn!(error = %e, "websocket upgrade rejected");
            return e.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, connection))
}

pub(crate) fn authenticate_connection(
    state: &NodeContext,
    query: WsAuthQuery,
) -> Result<Option<VerifiedSigner>, AuthError> {
    match query.credentials() {
        None => Ok(None),
        Some(credentials) => state
            .authorizer
            .authorize(SignerRole::NodeOrJobOwner, &credentials?)
            .map(Some),
    }
}

/// Handle one client message. Pure apart from the stop action.
pub fn handle_message(
    state: &NodeContext,
    connection: Option<&VerifiedSigner>,
    message: ClientMessage,
) -> ServerMessage {
    let require_connection = || connection.ok_or(AuthError::MissingCredentials);

    match message {
        ClientMessage::Ping => ServerMessage::Pong,
        ClientMessage::Subscribe => match require_connection() {
            Ok(_) => ServerMessage::Subscribed,
            Err(e) => ServerMessage::unauthorized(&e),
        },
        ClientMessage::JobState => match require_connection() {
            Ok(_) => {
                let response = job_state_response(state);
                ServerMessage::JobState {
                    phase: response.phase,
                    payload: response.payload,
                    timestamp: response.timestamp,
                    shared: response.shared,
                }
            }
            Err(e) => ServerMessage::unauthorized(&e),
        },
        ClientMessage::Operation { operation_id } => match require_connection() {
            Ok(_) => ServerMessage::Operation {
                record: state.ledger.get(&OperationId::new(&operation_id)),
                operation_id,
            },
            Err(e) => ServerMessage::unauthorized(&e),
        },
        ClientMessage::StopJob {
            signer,
            message,
            signature,
        } => {
            let verified = credentials(signer, message, signature).and_then(|credentials| {
                state
                    .authorizer
                    .authorize(SignerRole::NodeOrJobOwner, &credentials)
            });
            match verified {
                Ok(signer) => ServerMessage::JobStopped {
                    cancelled: stop_current_job(state, &signer),
                },
                Err(e) => {
                    warn!(error = %e, "websocket stop_job rejected");
                    ServerMessage::unauthorized(&e)
                }
            }
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<NodeContext>, connection: Option<VerifiedSigner>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events: Option<BroadcastStream<StateEvent>> = None;

    debug!(authenticated = connection.is_some(), "websocket connected");

    loop {
        let reply = tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => handle_message(&state, connection.as_ref(), message),
                    Err(e) => ServerMessage::Error {
                        code: "bad_request",
                        message: format!("Invalid message: {e}"),
                    },
                };
                if matches!(reply, ServerMessage::Subscribed) && events.is_none() {
                    events = Some(BroadcastStream::new(state.events.subscribe()));
                }
                reply
            }
            Some(event) = next_event(&mut events) => match event {
                Ok(event) => ServerMessage::Event { event },
                Err(BroadcastStreamRecvError::Lagged(skipped)) => ServerMessage::Error {
                    code: "lagged",
                    message: format!("{skipped} events dropped"),
                },
            },
        };

        let Ok(text) = serde_json::to_string(&reply) else {
            continue;
        };
        if sender.send(Message::Text(text)).await.is_err() {
            break;
        }
    }

    debug!("websocket disconnected");
}

async fn next_event(
    events: &mut Option<BroadcastStream<StateEvent>>,
) -> Option<Result<StateEvent, BroadcastStreamRecvError>> {
    match events {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::TestSigner;
    use crate::config::NodeConfig;
    use jobnode_core::{payload, OperationId};
    use serde_json::json;

    fn context(node: &TestSigner) -> Arc<NodeContext> {
        NodeContext::new(NodeConfig {
            address: node.address(),
            ..NodeConfig::default()
        })
    }

    fn query(creds: Credentials) -> WsAuthQuery {
        WsAuthQuery {
            signer: Some(creds.signer),
            message: Some(creds.message),
            signature: Some(creds.signature),
        }
    }

    #[test]
    fn test_anonymous_connection() {
        let node = TestSigner::generate();
        let state = context(&node);
        let connection = authenticate_connection(&state, WsAuthQuery::default()).unwrap();
        assert!(connection.is_none());

        assert!(matches!(
            handle_message(&state, None, ClientMessage::Ping),
            ServerMessage::Pong
        ));
        assert!(matches!(
            handle_message(&state, None, ClientMessage::Subscribe),
            ServerMessage::Error { code: "unauthorized", .. }
        ));
        assert!(matches!(
            handle_message(&state, None, ClientMessage::JobState),
            ServerMessage::Error { code: "unauthorized", .. }
        ));
    }

    #[test]
    fn test_connection_credentials() {
        let node = TestSigner::generate();
        let stranger = TestSigner::generate();
        let state = context(&node);

        let verified = authenticate_connection(&state, query(node.credentials("jobnode-auth")))
            .unwrap()
            .unwrap();
        assert_eq!(verified.address, node.address());

        let err = authenticate_connection(&state, query(stranger.credentials("jobnode-auth")))
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden { .. }));

        let partial = WsAuthQuery {
            signer: Some(node.address()),
            ..WsAuthQuery::default()
        };
        assert!(matches!(
            authenticate_connection(&state, partial),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_authenticated_reads() {
        let node = TestSigner::generate();
        let state = context(&node);
        let connection = authenticate_connection(&state, query(node.credentials("jobnode-auth")))
            .unwrap();
        state.job_state.transition(
            JobPhase::FlowStarted,
            payload(json!({ "flow": "f1", "scratch": 1 })),
        );
        state.ledger.set_host(&OperationId::new("op"), "10.0.0.5");

        match handle_message(&state, connection.as_ref(), ClientMessage::JobState) {
            ServerMessage::JobState { phase, shared, .. } => {
                assert_eq!(phase, JobPhase::FlowStarted);
                assert_eq!(shared.get("flow"), Some(&json!("f1")));
                assert!(shared.get("scratch").is_none());
            }
            other => panic!("unexpected reply {other:?}"),
        }

        match handle_message(
            &state,
            connection.as_ref(),
            ClientMessage::Operation {
                operation_id: "op".to_string(),
            },
        ) {
            ServerMessage::Operation { record, .. } => {
                assert_eq!(record.unwrap().host.as_deref(), Some("10.0.0.5"));
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn test_stop_job_verified_per_message() {
        let node = TestSigner::generate();
        let stranger = TestSigner::generate();
        let state = context(&node);
        let connection = authenticate_connection(&state, query(node.credentials("jobnode-auth")))
            .unwrap();
        let token = state.abort.current();

        // An authenticated connection alone is not enough.
        let reply = handle_message(
            &state,
            connection.as_ref(),
            ClientMessage::StopJob {
                signer: None,
                message: None,
                signature: None,
            },
        );
        assert!(matches!(reply, ServerMessage::Error { code: "unauthorized", .. }));
        assert!(!token.is_cancelled());

        let bad = stranger.credentials("jobnode-auth");
        let reply = handle_message(
            &state,
            None,
            ClientMessage::StopJob {
                signer: Some(bad.signer),
                message: Some(bad.message),
                signature: Some(bad.signature),
            },
        );
        assert!(matches!(reply, ServerMessage::Error { code: "unauthorized", .. }));
        assert!(!token.is_cancelled());

        let good = node.credentials("jobnode-auth");
        let reply = handle_message(
            &state,
            None,
            ClientMessage::StopJob {
                signer: Some(good.signer),
                message: Some(good.message),
                signature: Some(good.signature),
            },
        );
        assert!(matches!(reply, ServerMessage::JobStopped { cancelled: true }));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "action": "operation", "operation_id": "op-1" })).unwrap();
        assert!(matches!(msg, ClientMessage::Operation { ref operation_id } if operation_id == "op-1"));

        let reply = serde_json::to_value(ServerMessage::JobStopped { cancelled: false }).unwrap();
        assert_eq!(reply, json!({ "type": "job_stopped", "cancelled": false }));
    }
}
