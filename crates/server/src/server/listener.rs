//! TLS accept loop.
//!
//! For each incoming TCP connection the listener:
//! 1. Completes the TLS handshake; rustls rejects peers without a trusted
//!    client certificate at this point.
//! 2. Records the verified peer certificate as a [`PeerIdentity`] request extension.
//! 3. Serves HTTP/1.1 or HTTP/2 on the connection with the Axum router.
//!
//! A failed handshake only ends that connection; the loop keeps accepting.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::Request, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use rustls::pki_types::CertificateDer;
use rustls::ServerConfig;
use sha2::{Digest, Sha256};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, error, info, warn};

/// Verified client certificate of the connection a request arrived on.
#[derive(Debug, Clone)]
pub struct PeerIdentity {
    /// Lower-case hex SHA-256 of the leaf certificate's DER encoding.
    pub fingerprint: String,
}

impl PeerIdentity {
    fn from_chain(chain: &[CertificateDer<'_>]) -> Option<Self> {
        let leaf = chain.first()?;
        let digest = Sha256::digest(leaf.as_ref());
        let fingerprint = digest.iter().map(|b| format!("{b:02x}")).collect();
        Some(Self { fingerprint })
    }
}

/// Accept loop: terminate TLS on every connection from `listener` and serve
/// `router` over it.
///
/// Runs until the process is killed.
///
/// # Errors
///
/// Returns an error only if the listener's local address cannot be read.
pub async fn serve(listener: TcpListener, tls_config: Arc<ServerConfig>, router: Router) -> Result<()> {
    let acceptor = TlsAcceptor::from(tls_config);
    let addr = listener.local_addr()?;
    info!(addr = %addr, "mTLS listener ready");

    loop {
        match listener.accept().await {
            Ok((tcp_stream, peer_addr)) => {
                debug!(%peer_addr, "accepted TCP connection");
                let acceptor = acceptor.clone();
                let router = router.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(acceptor, tcp_stream, router).await {
                        warn!(%peer_addr, error = format!("{e:#}"), "connection error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "accept error");
            }
        }
    }
}

/// Handle a single TLS connection.
async fn handle_connection(acceptor: TlsAcceptor, tcp: TcpStream, router: Router) -> Result<()> {
    let tls_stream = acceptor
        .accept(tcp)
        .await
        .context("TLS handshake failed")?;

    let (_, connection) = tls_stream.get_ref();
    let peer = connection
        .peer_certificates()
        .and_then(PeerIdentity::from_chain);
    debug!(
        protocol = ?connection.protocol_version(),
        peer_fingerprint = peer.as_ref().map(|p| p.fingerprint.as_str()),
        "TLS handshake complete"
    );

    let service = hyper::service::service_fn(move |mut req: Request<Incoming>| {
        if let Some(peer) = &peer {
            req.extensions_mut().insert(peer.clone());
        }
        router.clone().oneshot(req)
    });

    auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(tls_stream), service)
        .await
        .map_err(|e| anyhow::anyhow!("failed to serve connection: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_hex_sha256_of_leaf() {
        let chain = vec![
            CertificateDer::from(b"leaf".to_vec()),
            CertificateDer::from(b"ca".to_vec()),
        ];
        let peer = PeerIdentity::from_chain(&chain).unwrap();
        assert_eq!(
            peer.fingerprint,
            "9f91161f43433e49a6de6db680d79f60159f2e4ac9172621a12846428158440b"
        );
    }

    #[test]
    fn empty_chain_has_no_identity() {
        assert!(PeerIdentity::from_chain(&[]).is_none());
    }
}
