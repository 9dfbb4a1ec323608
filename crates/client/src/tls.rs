//! TLS context construction for outbound mTLS calls.
//!
//! The context offers the key store's certificate chain to the server and
//! accepts any server certificate that is itself in the trust store or chains
//! to an anchor there.
//! Whether the server certificate must also name the host being dialled is an
//! explicit [`HostnameVerification`] policy. The default, `Disabled`, skips
//! the name check entirely, which weakens mTLS against relay attacks when the
//! trust store is broad; it is kept as the default so that a certificate
//! issued for an internal service name works when dialled as `localhost`.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use common::store::{self, Identity, StoreFormat, TrustStore};
use common::tls::{crypto_provider, PROTOCOL_VERSIONS};
use common::TlsConfigError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::{verify_server_cert_signed_by_trust_anchor, verify_server_name};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use tracing::{debug, warn};

/// Whether the server certificate's subject names are checked against the
/// host in the request URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostnameVerification {
    /// Any name is accepted once the chain is trusted.
    #[default]
    Disabled,
    /// The certificate must carry a SAN matching the dialled host.
    Strict,
}

impl From<bool> for HostnameVerification {
    fn from(verify: bool) -> Self {
        if verify {
            Self::Strict
        } else {
            Self::Disabled
        }
    }
}

/// Where to find the key and trust material.
#[derive(Clone)]
pub struct ClientTlsSettings {
    pub key_store_path: PathBuf,
    pub key_store_password: String,
    pub trust_store_path: PathBuf,
    pub trust_store_format: StoreFormat,
    pub trust_store_password: Option<String>,
    pub hostname_verification: HostnameVerification,
}

impl fmt::Debug for ClientTlsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientTlsSettings")
            .field("key_store_path", &self.key_store_path)
            .field("trust_store_path", &self.trust_store_path)
            .field("trust_store_format", &self.trust_store_format)
            .field("hostname_verification", &self.hostname_verification)
            .finish_non_exhaustive()
    }
}

/// Load both stores and build the client TLS context.
///
/// # Errors
///
/// Returns an error if either store cannot be read or opened with its
/// password, or rustls rejects the key material.
pub fn load(settings: &ClientTlsSettings) -> Result<ClientConfig, TlsConfigError> {
    let identity = store::load_key_store(&settings.key_store_path, &settings.key_store_password)?;
    let trust_store = store::load_trust_store(
        &settings.trust_store_path,
        settings.trust_store_format,
        settings.trust_store_password.as_deref(),
    )?;
    if settings.hostname_verification == HostnameVerification::Disabled {
        warn!("server hostname verification is disabled");
    }
    build_client_config(identity, trust_store, settings.hostname_verification)
}

/// Build a [`rustls::ClientConfig`] restricted to TLS 1.2/1.3 that presents
/// `identity` and trusts the servers admitted by `trust_store`.
///
/// # Errors
///
/// Returns an error if rustls rejects the certificate/key pair.
pub fn build_client_config(
    identity: Identity,
    trust_store: TrustStore,
    hostname_verification: HostnameVerification,
) -> Result<ClientConfig, TlsConfigError> {
    let provider = crypto_provider();
    let verifier = TrustStoreVerifier::new(
        trust_store,
        hostname_verification,
        provider.signature_verification_algorithms,
    );

    let config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(PROTOCOL_VERSIONS)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_client_auth_cert(identity.cert_chain, identity.key)?;

    Ok(config)
}

/// Server certificate verifier backed by the client trust store.
///
/// A leaf that is byte-for-byte one of the trust store's certificates is
/// accepted once its validity period holds, whatever its basic constraints;
/// this admits self-signed servers whose certificate is `CA:TRUE`. Any other
/// leaf must chain to a trust anchor (signatures, validity period, key usage).
/// The subject name is checked only under [`HostnameVerification::Strict`].
/// Revocation is not checked.
#[derive(Debug)]
pub struct TrustStoreVerifier {
    roots: Arc<RootCertStore>,
    trusted: Vec<CertificateDer<'static>>,
    hostname_verification: HostnameVerification,
    algorithms: WebPkiSupportedAlgorithms,
}

impl TrustStoreVerifier {
    pub fn new(
        trust_store: TrustStore,
        hostname_verification: HostnameVerification,
        algorithms: WebPkiSupportedAlgorithms,
    ) -> Self {
        Self {
            roots: Arc::new(trust_store.roots),
            trusted: trust_store.certificates,
            hostname_verification,
            algorithms,
        }
    }

    fn is_trusted_directly(&self, end_entity: &CertificateDer<'_>) -> bool {
        self.trusted
            .iter()
            .any(|cert| cert.as_ref() == end_entity.as_ref())
    }
}

/// Reject a certificate outside its `notBefore..=notAfter` window.
fn check_validity(cert: &CertificateDer<'_>, now: UnixTime) -> Result<(), rustls::Error> {
    let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref())
        .map_err(|_| rustls::Error::InvalidCertificate(CertificateError::BadEncoding))?;
    let validity = parsed.validity();
    let now = i64::try_from(now.as_secs()).unwrap_or(i64::MAX);

    if now < validity.not_before.timestamp() {
        return Err(rustls::Error::InvalidCertificate(CertificateError::NotValidYet));
    }
    if now > validity.not_after.timestamp() {
        return Err(rustls::Error::InvalidCertificate(CertificateError::Expired));
    }
    Ok(())
}

impl ServerCertVerifier for TrustStoreVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let cert = ParsedCertificate::try_from(end_entity)?;

        if self.is_trusted_directly(end_entity) {
            debug!("server certificate found directly in trust store");
            check_validity(end_entity, now)?;
        } else {
            verify_server_cert_signed_by_trust_anchor(
                &cert,
                &self.roots,
                intermediates,
                now,
                self.algorithms.all,
            )?;
        }

        match self.hostname_verification {
            HostnameVerification::Strict => verify_server_name(&cert, server_name)?,
            HostnameVerification::Disabled => {
                debug!(server_name = ?server_name, "skipping server name check");
            }
        }

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}
