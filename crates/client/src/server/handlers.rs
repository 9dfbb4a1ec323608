//! Axum request handlers for all client endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse};
use common::ServiceError;
use tracing::{info, warn};

use super::state::AppState;

/// `GET /client-endpoint`: call the server's secured endpoint over mTLS and
/// relay its body unmodified.
///
/// Upstream failures are not retried; they become `502` (or `504` on timeout).
pub async fn client_endpoint(State(state): State<AppState>) -> Response {
    info!("received request, calling server via mTLS");

    match state.transport.get_text((*state.secured_url).clone()).await {
        Ok(body) => {
            info!(response = %body, "received response from server");
            (StatusCode::OK, body).into_response()
        }
        Err(e) => {
            let err = ServiceError::from(e);
            warn!(error = %err, url = %state.secured_url, "call to server failed");
            error_response(&err)
        }
    }
}

/// `GET /health`: liveness check. The state exists only once the TLS
/// context has been built, so answering at all means the client is ready.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::new(err.code(), err.to_string()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upstream_error_renders_bad_gateway() {
        let resp = error_response(&ServiceError::Upstream("connection refused".into()));
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "bad_gateway");
    }

    #[test]
    fn timeout_renders_gateway_timeout() {
        let resp = error_response(&ServiceError::UpstreamTimeout("30s".into()));
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
