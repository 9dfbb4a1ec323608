//! Axum request handlers for all server endpoints.

use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use common::protocol::{ErrorResponse, HealthResponse, SERVER_GREETING};
use tracing::info;

use super::listener::PeerIdentity;

/// `GET /secured-endpoint`: reachable only after the client certificate has
/// been verified by the TLS layer.
pub async fn secured_endpoint(peer: Option<Extension<PeerIdentity>>) -> &'static str {
    match peer {
        Some(Extension(peer)) => info!(
            peer_fingerprint = %peer.fingerprint,
            "called secured service successfully"
        ),
        None => info!("called secured service successfully"),
    }
    SERVER_GREETING
}

/// `GET /health`: liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}
