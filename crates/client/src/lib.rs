//! Client side of the portrait job lifecycle.
//!
//! Holds the durable session record for an upload, checks it against the
//! server's status endpoint, and decides whether to resume, redirect, or
//! offer the user a choice when they come back.

pub mod config;
pub mod error;
pub mod poller;
pub mod recovery;
pub mod session;
pub mod status;

pub use error::ClientError;
