//! Axum HTTPS server, routing, and middleware.
//!
//! # Responsibilities
//! - Build the rustls server config that demands a client certificate.
//! - Accept TCP connections, complete the TLS handshake, and hand each
//!   connection to hyper with the Axum router as its service.
//! - Define the Axum router with all routes and shared middleware.

pub mod handlers;
pub mod listener;
pub mod router;
pub mod tls;
