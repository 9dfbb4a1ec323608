//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use anyhow::Result;
use hyper::Uri;

use crate::config::Config;
use crate::tls;
use crate::transport::MtlsTransport;

/// Application state shared across all request handlers.
///
/// Cloning is cheap: the transport shares its connection pool and TLS context,
/// and the target URL is `Arc`-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Outbound mTLS transport, built once at startup.
    pub transport: MtlsTransport,
    /// Full URL of the server's secured endpoint.
    pub secured_url: Arc<Uri>,
}

impl AppState {
    pub fn new(transport: MtlsTransport, secured_url: Uri) -> Self {
        Self {
            transport,
            secured_url: Arc::new(secured_url),
        }
    }

    /// Load the key and trust stores named in `cfg` and build the transport.
    ///
    /// This is the fail-fast step of startup: it must succeed before the
    /// inbound listener is bound.
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be loaded or the TLS context
    /// cannot be built.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let tls = tls::load(&cfg.tls_settings())?;
        let transport = MtlsTransport::new(tls, cfg.timeouts());
        Ok(Self::new(transport, cfg.secured_endpoint_url()?))
    }
}
