//! Host header validation

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::WebError;
use crate::server::AppState;

/// Refuse requests whose `Host` differs from the configured domain
///
/// Passes everything through when no domain is configured.
pub async fn validate_host(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected) = state.expected_host.as_deref() {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        if host != expected {
            warn!("Rejected request for host {:?}, expected {}", host, expected);
            return WebError::InvalidHost.into_response();
        }
    }

    next.run(request).await
}
