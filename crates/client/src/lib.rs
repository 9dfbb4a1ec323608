//! `mtls-client`: plain HTTP service that relays each call to the mTLS
//! server, authenticating with a client certificate from its key store.

pub mod config;
pub mod server;
pub mod tls;
pub mod transport;
