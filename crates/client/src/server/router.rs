//! Axum router construction.

use axum::{routing::get, Router};
use common::protocol::{CLIENT_ENDPOINT_PATH, HEALTH_PATH};
use tower_http::trace::TraceLayer;

use super::{handlers, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// No server-side timeout layer: the outbound transport already bounds each
/// relayed call.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route(CLIENT_ENDPOINT_PATH, get(handlers::client_endpoint))
        .route(HEALTH_PATH, get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
