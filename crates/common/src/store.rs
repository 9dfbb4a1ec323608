//! Key store and trust store loading.
//!
//! A key store is a PKCS#12 container holding the private key and certificate
//! chain this process presents to its peer. A trust store is either a PKCS#12
//! container of trusted-certificate entries (the layout Java's `keytool`
//! produces) or a PEM bundle. Both are read once at startup; any failure is a
//! [`TlsConfigError`] and aborts initialisation.

use std::path::{Path, PathBuf};

use p12_keystore::{KeyStore, KeyStoreEntry};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::RootCertStore;
use serde::Deserialize;
use tracing::debug;

use crate::error::TlsConfigError;

/// On-disk encoding of a trust store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
    /// Password-protected PKCS#12 container.
    #[default]
    Pkcs12,
    /// Concatenated PEM `CERTIFICATE` blocks; no password.
    Pem,
}

/// Key material presented to the peer during the handshake.
#[derive(Debug)]
pub struct Identity {
    /// Certificate chain, leaf first.
    pub cert_chain: Vec<CertificateDer<'static>>,
    /// Private key matching the leaf certificate.
    pub key: PrivateKeyDer<'static>,
}

/// Load the first private key entry of a PKCS#12 key store.
///
/// # Errors
///
/// Fails if the file cannot be read, the password is wrong, the container is
/// malformed, or it holds no private key entry.
pub fn load_key_store(path: &Path, password: &str) -> Result<Identity, TlsConfigError> {
    let store = open_pkcs12(path, password)?;

    let (alias, entry) = store
        .private_key_chain()
        .ok_or_else(|| TlsConfigError::NoPrivateKey {
            path: path.to_owned(),
        })?;
    debug!(
        path = %path.display(),
        alias,
        chain_len = entry.chain().len(),
        "loaded key store entry"
    );

    let cert_chain = entry
        .chain()
        .iter()
        .map(|cert| CertificateDer::from(cert.as_der().to_vec()))
        .collect();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(entry.key().to_vec()));

    Ok(Identity { cert_chain, key })
}

/// Certificates read from a trust store.
#[derive(Debug, Clone)]
pub struct TrustStore {
    /// Every certificate as a trust anchor for path building.
    pub roots: RootCertStore,
    /// The same certificates as stored, for exact-match trust of self-signed peers.
    pub certificates: Vec<CertificateDer<'static>>,
}

/// Load every trusted certificate of a trust store.
///
/// For PKCS#12 stores both trusted-certificate entries and the certificates of
/// any key entries are trusted. `password` is ignored for PEM bundles.
///
/// # Errors
///
/// Fails if the file cannot be read or decrypted, a certificate is rejected as
/// an anchor, or the store yields no anchor at all.
pub fn load_trust_store(
    path: &Path,
    format: StoreFormat,
    password: Option<&str>,
) -> Result<TrustStore, TlsConfigError> {
    let certificates = match format {
        StoreFormat::Pkcs12 => pkcs12_certificates(path, password.unwrap_or_default())?,
        StoreFormat::Pem => pem_certificates(path)?,
    };

    let mut roots = RootCertStore::empty();
    for cert in &certificates {
        roots
            .add(cert.clone())
            .map_err(|source| TlsConfigError::Certificate {
                path: path.to_owned(),
                source,
            })?;
    }

    if roots.is_empty() {
        return Err(TlsConfigError::EmptyTrustStore {
            path: path.to_owned(),
        });
    }
    debug!(path = %path.display(), anchors = roots.len(), "loaded trust store");
    Ok(TrustStore {
        roots,
        certificates,
    })
}

/// Load a PEM certificate chain and a PEM private key.
///
/// # Errors
///
/// Fails if either file cannot be read, the chain is empty, or no private key
/// is found.
pub fn load_pem_identity(cert_path: &Path, key_path: &Path) -> Result<Identity, TlsConfigError> {
    let cert_chain = pem_certificates(cert_path)?;
    if cert_chain.is_empty() {
        return Err(pem_error(cert_path, "no certificate found"));
    }

    let key_pem = read_file(key_path)?;
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|e| pem_error(key_path, e.to_string()))?
        .ok_or_else(|| pem_error(key_path, "no private key found"))?;

    Ok(Identity { cert_chain, key })
}

fn open_pkcs12(path: &Path, password: &str) -> Result<KeyStore, TlsConfigError> {
    let data = read_file(path)?;
    KeyStore::from_pkcs12(&data, password).map_err(|source| TlsConfigError::KeyStore {
        path: path.to_owned(),
        source,
    })
}

fn pkcs12_certificates(
    path: &Path,
    password: &str,
) -> Result<Vec<CertificateDer<'static>>, TlsConfigError> {
    let store = open_pkcs12(path, password)?;

    let mut certs = Vec::new();
    for (alias, entry) in store.entries() {
        match entry {
            KeyStoreEntry::Certificate(cert) => {
                debug!(alias = %alias, subject = cert.subject(), "trusted certificate entry");
                certs.push(CertificateDer::from(cert.as_der().to_vec()));
            }
            KeyStoreEntry::PrivateKeyChain(chain) => {
                debug!(alias = %alias, "using key entry chain as trust anchors");
                certs.extend(
                    chain
                        .chain()
                        .iter()
                        .map(|cert| CertificateDer::from(cert.as_der().to_vec())),
                );
            }
        }
    }
    Ok(certs)
}

fn pem_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsConfigError> {
    let pem = read_file(path)?;
    rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| pem_error(path, e.to_string()))
}

fn read_file(path: &Path) -> Result<Vec<u8>, TlsConfigError> {
    std::fs::read(path).map_err(|source| TlsConfigError::Io {
        path: path.to_owned(),
        source,
    })
}

fn pem_error(path: &Path, reason: impl Into<String>) -> TlsConfigError {
    TlsConfigError::Pem {
        path: PathBuf::from(path),
        reason: reason.into(),
    }
}
