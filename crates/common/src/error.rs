//! Common error types shared across crates.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to assemble TLS material at startup.
///
/// Every variant is fatal: a process that receives one of these must not bind
/// its inbound listener.
#[derive(Debug, Error)]
pub enum TlsConfigError {
    /// A store or PEM file could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PKCS#12 container is malformed or the password is wrong.
    #[error("failed to open key store {}: {source}", path.display())]
    KeyStore {
        path: PathBuf,
        #[source]
        source: p12_keystore::error::Error,
    },

    /// The key store opened but holds no private key entry.
    #[error("key store {} contains no private key entry", path.display())]
    NoPrivateKey { path: PathBuf },

    /// The trust store opened but yielded no usable trust anchor.
    #[error("trust store {} contains no trusted certificates", path.display())]
    EmptyTrustStore { path: PathBuf },

    /// A PEM file could not be parsed, or held none of the expected items.
    #[error("invalid PEM in {}: {reason}", path.display())]
    Pem { path: PathBuf, reason: String },

    /// A certificate was rejected as a trust anchor.
    #[error("invalid certificate in {}: {source}", path.display())]
    Certificate {
        path: PathBuf,
        #[source]
        source: rustls::Error,
    },

    /// rustls refused the assembled configuration (e.g. key does not match certificate).
    #[error("failed to build TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),

    /// The peer certificate verifier could not be built.
    #[error("failed to build certificate verifier: {0}")]
    Verifier(#[from] rustls::client::VerifierBuilderError),
}

/// Request-level service error.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::Upstream`] → 502
/// - [`ServiceError::UpstreamTimeout`] → 504
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The upstream call failed: connection refused, handshake rejected, or non-2xx reply.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// The upstream call did not complete within the configured timeout.
    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::Upstream(_) => 502,
            ServiceError::UpstreamTimeout(_) => 504,
        }
    }

    /// Short machine-readable code used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Upstream(_) => "bad_gateway",
            ServiceError::UpstreamTimeout(_) => "gateway_timeout",
        }
    }
}
