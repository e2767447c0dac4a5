//! REST authorization middleware.
//!
//! Credentials travel in two headers:
//! - `x-signer-address`: hex public key of the signer
//! - `authorization`: `<message>:<base64 signature>`

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::{AuthError, Credentials, SignerRole};
use crate::state::NodeContext;

pub const SIGNER_HEADER: &str = "x-signer-address";
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Middleware state: the node context plus the role a route group requires.
#[derive(Clone)]
pub struct RoleGate {
    ctx: Arc<NodeContext>,
    role: SignerRole,
}

impl RoleGate {
    pub fn new(ctx: Arc<NodeContext>, role: SignerRole) -> Self {
        Self { ctx, role }
    }
}

/// Parse credentials out of request headers.
pub fn credentials_from_headers(headers: &HeaderMap) -> Result<Credentials, AuthError> {
    let signer = header_str(headers, SIGNER_HEADER)?;
    let authorization = header_str(headers, AUTHORIZATION_HEADER)?;

    // base64 never contains ':', so the last one separates message and signature
    let (message, signature) = authorization.rsplit_once(':').ok_or_else(|| {
        AuthError::Malformed("authorization must be '<message>:<signature>'".to_string())
    })?;

    Ok(Credentials {
        signer: signer.to_string(),
        message: message.to_string(),
        signature: signature.to_string(),
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AuthError> {
    headers
        .get(name)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::Malformed(format!("{name} is not valid ASCII")))
}

/// Verify the request's signature for the gate's role before the handler runs.
///
/// On success the [`VerifiedSigner`](super::VerifiedSigner) is inserted into
/// request extensions.
pub async fn authorize_request(
    State(gate): State<RoleGate>,
    mut req: Request,
    next: Next,
) -> Response {
    let verified = credentials_from_headers(req.headers())
        .and_then(|credentials| gate.ctx.authorizer.authorize(gate.role, &credentials));

    match verified {
        Ok(signer) => {
            debug!(signer = %signer.address, role = %gate.role, path = %req.uri().path(), "request authorized");
            req.extensions_mut().insert(signer);
            next.run(req).await
        }
        Err(e) => {
            warn!(error = %e, role = %gate.role, path = %req.uri().path(), "request rejected");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNER_HEADER, HeaderValue::from_static("abcd"));
        headers.insert(AUTHORIZATION_HEADER, HeaderValue::from_static("msg:with:colons:c2ln"));

        let creds = credentials_from_headers(&headers).unwrap();
        assert_eq!(creds.signer, "abcd");
        assert_eq!(creds.message, "msg:with:colons");
        assert_eq!(creds.signature, "c2ln");
    }

    #[test]
    fn test_missing_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            credentials_from_headers(&headers),
            Err(AuthError::MissingCredentials)
        ));

        headers.insert(SIGNER_HEADER, HeaderValue::from_static("abcd"));
        headers.insert(AUTHORIZATION_HEADER, HeaderValue::from_static("no-separator"));
        assert!(matches!(
            credentials_from_headers(&headers),
            Err(AuthError::Malformed(_))
        ));
    }
}
