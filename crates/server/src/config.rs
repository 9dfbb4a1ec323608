//! Configuration loading and validation for the mTLS server.
//!
//! All values are read from environment variables at startup. The process
//! exits before binding its listener if any required variable is missing.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// TCP port the HTTPS listener binds on all interfaces.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// PEM certificate chain the server presents. **Required.**
    pub tls_cert_path: String,

    /// PEM private key matching `tls_cert_path`. **Required.**
    pub tls_key_path: String,

    /// PEM bundle of CA certificates client certificates must chain to. **Required.**
    pub client_ca_path: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP/gRPC endpoint; span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_listen_port() -> u16 {
    9000
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
            .context("failed to build server configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise server configuration")?;

        c.validate()?;
        Ok(c)
    }

    pub fn tls_cert_path(&self) -> &Path {
        Path::new(&self.tls_cert_path)
    }

    pub fn tls_key_path(&self) -> &Path {
        Path::new(&self.tls_key_path)
    }

    pub fn client_ca_path(&self) -> &Path {
        Path::new(&self.client_ca_path)
    }

    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.tls_cert_path, "TLS_CERT_PATH")?;
        ensure_non_empty(&self.tls_key_path, "TLS_KEY_PATH")?;
        ensure_non_empty(&self.client_ca_path, "CLIENT_CA_PATH")?;
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            listen_port: default_listen_port(),
            tls_cert_path: "certs/server.crt".into(),
            tls_key_path: "certs/server.key".into(),
            client_ca_path: "certs/ca.crt".into(),
            log_level: default_log_level(),
            otel_exporter_otlp_endpoint: None,
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(default_listen_port(), 9000);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_client_ca() {
        let cfg = Config {
            client_ca_path: "  ".into(),
            ..valid()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("CLIENT_CA_PATH"));
    }

    #[test]
    fn validate_rejects_port_zero() {
        let cfg = Config {
            listen_port: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }
}
