//! `mtls-server`: HTTPS service guarded by mutual TLS.
//!
//! The listener requires every peer to present a certificate that chains to
//! the configured client CA bundle before any request reaches a handler.

pub mod config;
pub mod server;
