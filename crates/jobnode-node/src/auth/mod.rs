//! Signature-based authorization for the REST and WebSocket surface.
//!
//! Every protected action names a [`SignerRole`]. A caller presents
//! [`Credentials`] (signer key, agreed message, signature); the
//! [`Authorizer`] checks the message, the signature and finally whether the
//! signer may act in that role. Nothing is mutated on failure.

use std::fmt;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use jobnode_core::JobStateManager;

use crate::http::responses::ErrorResponse;

pub mod middleware;
pub mod signature;

pub use middleware::{authorize_request, RoleGate};
pub use signature::{public_key_hex, sign_message, verify_signature};

/// Identity a protected action requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerRole {
    Backend,
    JobOwner,
    NodeOwner,
    NodeOrJobOwner,
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Backend => "backend",
            Self::JobOwner => "job owner",
            Self::NodeOwner => "node owner",
            Self::NodeOrJobOwner => "node or job owner",
        };
        f.write_str(name)
    }
}

/// What a caller claims: who signed, what was signed and the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub signer: String,
    pub message: String,
    pub signature: String,
}

/// Identity attached to a request once its credentials check out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSigner {
    pub address: String,
    pub role: SignerRole,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("malformed credentials: {0}")]
    Malformed(String),

    #[error("signed message does not match the expected message")]
    UnexpectedMessage,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("signer {signer} is not allowed to act as {role}")]
    Forbidden { signer: String, role: SignerRole },
}

impl AuthError {
    /// 401 when the caller is unauthenticated, 403 when authenticated but not allowed.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Who may act in each role.
#[derive(Debug, Clone)]
pub struct SignerRegistry {
    backend: Option<String>,
    node_owner: String,
}

impl SignerRegistry {
    pub fn new(backend: Option<String>, node_owner: impl Into<String>) -> Self {
        Self {
            backend,
            node_owner: node_owner.into(),
        }
    }

    /// Whether `signer` may act as `role` given the current job state.
    ///
    /// The job owner is the `owner` field of the shared `job` value.
    pub fn accepts(&self, role: SignerRole, signer: &str, jobs: &JobStateManager) -> bool {
        match role {
            SignerRole::Backend => self
                .backend
                .as_deref()
                .is_some_and(|backend| same_key(backend, signer)),
            SignerRole::NodeOwner => same_key(&self.node_owner, signer),
            SignerRole::JobOwner => job_owner(jobs).is_some_and(|owner| same_key(&owner, signer)),
            SignerRole::NodeOrJobOwner => {
                self.accepts(SignerRole::NodeOwner, signer, jobs)
                    || self.accepts(SignerRole::JobOwner, signer, jobs)
            }
        }
    }
}

fn same_key(expected: &str, signer: &str) -> bool {
    !expected.is_empty() && expected.eq_ignore_ascii_case(signer)
}

fn job_owner(jobs: &JobStateManager) -> Option<String> {
    let job = jobs.shared("job")?;
    job.get("owner")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// The single verification primitive shared by REST and WebSocket entry points.
pub struct Authorizer {
    message: String,
    registry: SignerRegistry,
    jobs: Arc<JobStateManager>,
}

impl Authorizer {
    pub fn new(message: impl Into<String>, registry: SignerRegistry, jobs: Arc<JobStateManager>) -> Self {
        Self {
            message: message.into(),
            registry,
            jobs,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn authorize(&self, role: SignerRole, credentials: &Credentials) -> Result<VerifiedSigner, AuthError> {
        if credentials.message != self.message {
            return Err(AuthError::UnexpectedMessage);
        }
        verify_signature(
            &credentials.signer,
            credentials.message.as_bytes(),
            &credentials.signature,
        )?;
        if !self.registry.accepts(role, &credentials.signer, &self.jobs) {
            return Err(AuthError::Forbidden {
                signer: credentials.signer.clone(),
                role,
            });
        }
        Ok(VerifiedSigner {
            address: credentials.signer.clone(),
            role,
        })
    }
}
