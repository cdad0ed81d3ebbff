//! Sonogen API server library.
//!
//! Exposes config, state, error handling and routes so integration tests
//! and the binary entrypoint build the same application.

pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod projection;
pub mod response;
pub mod router;
pub mod routes;
pub mod signer;
pub mod state;
