//! Request authentication seam

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::ServerState;

/// Header carrying an API key.
pub const API_KEY_HEADER: &str = "x-api-key";

const CHALLENGE: &str = r#"Basic realm="Note Render""#;

/// Raw credential headers of a request. Parsing is left to the [`Authenticator`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub authorization: Option<String>,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Credentials {
            api_key: value(API_KEY_HEADER),
            authorization: value(header::AUTHORIZATION.as_str()),
        }
    }
}

/// Decides whether a request may proceed.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> bool;
}

/// Lets every request through.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl Authenticator for OpenAccess {
    fn authenticate(&self, _credentials: &Credentials) -> bool {
        true
    }
}

/// Middleware rejecting requests the configured authenticator refuses.
pub async fn require_auth(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let credentials = Credentials::from_headers(request.headers());
    if state.auth.authenticate(&credentials) {
        return next.run(request).await;
    }

    debug!("Rejected unauthenticated request to {}", request.uri().path());
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, CHALLENGE)],
        "Authentication required",
    )
        .into_response()
}
