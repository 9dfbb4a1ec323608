//! Plain HTTP front end of the client service.
//!
//! # Responsibilities
//! - Hold the shared [`state::AppState`]: the mTLS transport and target URL.
//! - Define the Axum router with all routes and shared middleware.
//! - Relay each inbound call to the mTLS server and map failures to 5xx.

pub mod handlers;
pub mod router;
pub mod state;
