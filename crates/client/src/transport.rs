//! Outbound HTTPS transport configured for mutual TLS.
//!
//! [`MtlsTransport`] wraps a pooled hyper client whose connector completes
//! every handshake with the single [`rustls::ClientConfig`] built at startup.
//! Clones share the pool and the TLS context.

use std::error::Error as StdError;
use std::time::Duration;

use bytes::Bytes;
use common::ServiceError;
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{StatusCode, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use rustls::ClientConfig;
use thiserror::Error;
use tracing::debug;

/// Largest response body accepted from the server.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Bounds applied to every outbound call.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Establishing the TCP connection.
    pub connect: Duration,
    /// The whole call, from connect to the last body byte.
    pub request: Duration,
}

/// Failure of a single outbound call. Never retried.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connecting, the TLS handshake, or sending the request failed.
    #[error("request to server failed")]
    Request(#[from] hyper_util::client::legacy::Error),

    /// The response body could not be read.
    #[error("failed to read response body")]
    Body(#[source] Box<dyn StdError + Send + Sync>),

    /// The response body exceeded [`MAX_BODY_BYTES`].
    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(usize),

    /// The server answered with a non-2xx status.
    #[error("server responded with {0}")]
    Status(StatusCode),

    /// The response body is not valid UTF-8 text.
    #[error("response body is not valid UTF-8")]
    InvalidUtf8,

    /// The call did not complete within the request timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl From<UpstreamError> for ServiceError {
    fn from(err: UpstreamError) -> Self {
        if let UpstreamError::Timeout(_) = err {
            ServiceError::UpstreamTimeout(err.to_string())
        } else {
            ServiceError::Upstream(error_chain(&err))
        }
    }
}

/// Render an error with all of its sources, outermost first.
fn error_chain(err: &dyn StdError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// HTTPS-only client presenting the configured client certificate.
#[derive(Clone)]
pub struct MtlsTransport {
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    request_timeout: Duration,
}

impl MtlsTransport {
    /// Wrap `tls` in a pooled HTTP/1.1 client. The TLS context is not rebuilt
    /// per request.
    pub fn new(tls: ClientConfig, timeouts: Timeouts) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(timeouts.connect));

        let https = HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_only()
            .enable_http1()
            .wrap_connector(http);

        Self {
            client: Client::builder(TokioExecutor::new()).build(https),
            request_timeout: timeouts.request,
        }
    }

    /// `GET uri` and return the full response body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or handshake fails, the status is
    /// not 2xx, the body is not UTF-8, or the request timeout elapses.
    pub async fn get_text(&self, uri: Uri) -> Result<String, UpstreamError> {
        tokio::time::timeout(self.request_timeout, self.fetch(uri))
            .await
            .map_err(|_| UpstreamError::Timeout(self.request_timeout))?
    }

    async fn fetch(&self, uri: Uri) -> Result<String, UpstreamError> {
        debug!(%uri, "sending mTLS request");
        let response = self.client.get(uri).await?;
        let status = response.status();
        let body = read_text(response.into_body(), MAX_BODY_BYTES).await;

        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }
        body
    }
}

/// Collect at most `limit` bytes of `body` and decode them as UTF-8.
async fn read_text<B>(body: B, limit: usize) -> Result<String, UpstreamError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|err| {
            if err.is::<LengthLimitError>() {
                UpstreamError::BodyTooLarge(limit)
            } else {
                UpstreamError::Body(err)
            }
        })?
        .to_bytes();

    String::from_utf8(bytes.to_vec()).map_err(|_| UpstreamError::InvalidUtf8)
}
