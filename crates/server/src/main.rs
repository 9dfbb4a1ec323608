//! `mtls-server`: binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging (and OTLP export when configured).
//! 3. Load the server identity and client CA bundle into a rustls config.
//! 4. Bind the TCP listener and start the mTLS accept loop.

use anyhow::Result;
use tracing::{error, info};

use mtls_server::config::Config;
use mtls_server::server;

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
        "mtls-server",
        &cfg.log_level,
        cfg.otel_exporter_otlp_endpoint.as_deref(),
    )?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "mtls-server starting"
    );

    // -----------------------------------------------------------------------
    // 3. TLS
    // -----------------------------------------------------------------------
    let tls_config = server::tls::load(&cfg).map_err(|e| {
        error!(error = %e, "TLS configuration invalid, refusing to start");
        e
    })?;

    // -----------------------------------------------------------------------
    // 4. HTTPS server
    // -----------------------------------------------------------------------
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::listener::serve(listener, tls_config, server::router::build()).await
}
