//! Configuration loading and validation for the mTLS client.
//!
//! All values are read from environment variables at startup. The process
//! exits before binding its listener if any required variable is missing or
//! invalid.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use common::protocol::SECURED_ENDPOINT_PATH;
use common::store::StoreFormat;
use hyper::Uri;
use serde::Deserialize;

use crate::tls::ClientTlsSettings;
use crate::transport::Timeouts;

/// Validated client configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// TCP port the plain HTTP listener binds on all interfaces.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Base URL of the mTLS server; must be `https://`.
    #[serde(default = "default_server_base_url")]
    pub server_base_url: String,

    /// PKCS#12 key store holding the client key and certificate. **Required.**
    pub key_store_path: String,

    /// Password of the key store. **Required.**
    pub key_store_password: String,

    /// Trust store holding the CA certificates the server must chain to. **Required.**
    pub trust_store_path: String,

    /// Password of the trust store; required for PKCS#12 trust stores.
    #[serde(default)]
    pub trust_store_password: Option<String>,

    /// Encoding of the trust store: `pkcs12` or `pem`.
    #[serde(default)]
    pub trust_store_format: StoreFormat,

    /// Check the server certificate's name against the host in `server_base_url`.
    #[serde(default)]
    pub verify_hostname: bool,

    /// Upper bound on establishing the TCP connection to the server.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound on a whole outbound call: connect, handshake, and body.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP/gRPC endpoint; span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_server_base_url() -> String {
    "https://localhost:9000".into()
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build client configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise client configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Full URL of the server's secured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `server_base_url` does not form a valid URI.
    pub fn secured_endpoint_url(&self) -> Result<Uri> {
        let base = self.server_base_url.trim_end_matches('/');
        format!("{base}{SECURED_ENDPOINT_PATH}")
            .parse()
            .with_context(|| format!("SERVER_BASE_URL is not a valid URL: {}", self.server_base_url))
    }

    pub fn tls_settings(&self) -> ClientTlsSettings {
        ClientTlsSettings {
            key_store_path: PathBuf::from(&self.key_store_path),
            key_store_password: self.key_store_password.clone(),
            trust_store_path: PathBuf::from(&self.trust_store_path),
            trust_store_format: self.trust_store_format,
            trust_store_password: self.trust_store_password.clone(),
            hostname_verification: self.verify_hostname.into(),
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            request: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.key_store_path, "KEY_STORE_PATH")?;
        ensure_non_empty(&self.key_store_password, "KEY_STORE_PASSWORD")?;
        ensure_non_empty(&self.trust_store_path, "TRUST_STORE_PATH")?;

        if self.trust_store_format == StoreFormat::Pkcs12 && self.trust_store_password.is_none() {
            anyhow::bail!("TRUST_STORE_PASSWORD is required for a pkcs12 trust store");
        }
        if self.connect_timeout_secs == 0 {
            anyhow::bail!("CONNECT_TIMEOUT_SECS must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }

        let url = self.secured_endpoint_url()?;
        if url.scheme_str() != Some("https") {
            anyhow::bail!("SERVER_BASE_URL must use https://");
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_port", &self.listen_port)
            .field("server_base_url", &self.server_base_url)
            .field("key_store_path", &self.key_store_path)
            .field("trust_store_path", &self.trust_store_path)
            .field("trust_store_format", &self.trust_store_format)
            .field("verify_hostname", &self.verify_hostname)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
