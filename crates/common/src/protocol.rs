//! Paths, fixed bodies, and JSON types exchanged between the two services and
//! their callers.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Server route reachable only over an mTLS channel.
pub const SECURED_ENDPOINT_PATH: &str = "/secured-endpoint";

/// Client route that relays a call to [`SECURED_ENDPOINT_PATH`].
pub const CLIENT_ENDPOINT_PATH: &str = "/client-endpoint";

/// Liveness route exposed by both services.
pub const HEALTH_PATH: &str = "/health";

/// Body returned by the server's secured endpoint.
pub const SERVER_GREETING: &str = "Hello from server!";

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_gateway"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`: a process that answers has finished its TLS setup.
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }
}
