//! `mtls-client`: binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging (and OTLP export when configured).
//! 3. Load the key and trust stores and build the mTLS transport. Any failure
//!    here ends the process before a listener exists.
//! 4. Build the Axum router and start the plain HTTP server.

use anyhow::Result;
use tracing::{error, info};

use mtls_client::config::Config;
use mtls_client::server::{router, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    common::telemetry::init(
        "mtls-client",
        &cfg.log_level,
        cfg.otel_exporter_otlp_endpoint.as_deref(),
    )?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        server_base_url = %cfg.server_base_url,
        "mtls-client starting"
    );

    // -----------------------------------------------------------------------
    // 3. TLS context + transport
    // -----------------------------------------------------------------------
    let state = AppState::from_config(&cfg).map_err(|e| {
        error!(error = format!("{e:#}"), "TLS configuration invalid, refusing to start");
        e
    })?;

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::build(state)).await?;

    Ok(())
}
