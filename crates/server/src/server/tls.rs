//! rustls server configuration demanding a client certificate.
//!
//! The server's own identity is a PEM certificate chain and key; client
//! certificates are verified against a PEM bundle of CA certificates. A peer
//! that presents no certificate, or one that does not chain to that bundle,
//! fails the handshake before any HTTP request is read.

use std::sync::Arc;

use common::store::{self, Identity, StoreFormat};
use common::tls::{crypto_provider, PROTOCOL_VERSIONS};
use common::TlsConfigError;
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};

use crate::config::Config;

/// Load the server identity and client CA bundle named in `cfg` and build the
/// server config from them.
///
/// # Errors
///
/// Returns an error if any file is missing or malformed, or rustls rejects the
/// resulting configuration.
pub fn load(cfg: &Config) -> Result<Arc<ServerConfig>, TlsConfigError> {
    let identity = store::load_pem_identity(cfg.tls_cert_path(), cfg.tls_key_path())?;
    let client_cas = store::load_trust_store(cfg.client_ca_path(), StoreFormat::Pem, None)?;
    build_server_config(identity, client_cas.roots)
}

/// Build a [`rustls::ServerConfig`] restricted to TLS 1.2/1.3 that requires a
/// client certificate chaining to `client_roots`.
///
/// # Errors
///
/// Returns an error if the verifier cannot be built or rustls rejects the
/// certificate/key pair.
pub fn build_server_config(
    identity: Identity,
    client_roots: RootCertStore,
) -> Result<Arc<ServerConfig>, TlsConfigError> {
    let provider = crypto_provider();

    let verifier =
        WebPkiClientVerifier::builder_with_provider(Arc::new(client_roots), provider.clone())
            .build()?;

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(PROTOCOL_VERSIONS)?
        .with_client_cert_verifier(verifier)
        .with_single_cert(identity.cert_chain, identity.key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        let certs = concat!(env!("CARGO_MANIFEST_DIR"), "/../../certs");
        Config {
            listen_port: 9000,
            tls_cert_path: format!("{certs}/server.crt"),
            tls_key_path: format!("{certs}/server.key"),
            client_ca_path: format!("{certs}/ca.crt"),
            log_level: "info".into(),
            otel_exporter_otlp_endpoint: None,
        }
    }

    #[test]
    fn builds_from_demo_pki() {
        let config = load(&cfg()).unwrap();
        assert_eq!(config.alpn_protocols.len(), 2);
    }

    #[test]
    fn rejects_missing_client_ca() {
        let cfg = Config {
            client_ca_path: "/nonexistent/ca.crt".into(),
            ..cfg()
        };
        assert!(matches!(load(&cfg), Err(TlsConfigError::Io { .. })));
    }

    #[test]
    fn rejects_key_file_without_key() {
        let cfg = Config {
            tls_key_path: cfg().tls_cert_path,
            ..cfg()
        };
        assert!(matches!(load(&cfg), Err(TlsConfigError::Pem { .. })));
    }
}
