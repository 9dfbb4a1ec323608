//! Axum router construction.

use std::time::Duration;

use axum::{routing::get, Router};
use common::protocol::{HEALTH_PATH, SECURED_ENDPOINT_PATH};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build() -> Router {
    Router::new()
        .route(SECURED_ENDPOINT_PATH, get(handlers::secured_endpoint))
        .route(HEALTH_PATH, get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
