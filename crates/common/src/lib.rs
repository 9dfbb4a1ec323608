//! Common types, key store loading, TLS policy, and errors shared across the
//! mTLS demo crates.

pub mod error;
pub mod protocol;
pub mod store;
pub mod telemetry;
pub mod tls;

pub use error::{ServiceError, TlsConfigError};
