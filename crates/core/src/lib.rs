//! Domain logic for the Sonogen portrait pipeline.
//!
//! This crate has no I/O. It owns the rules that every other layer defers
//! to:
//!
//! - [`stage`]: the job stage state machine and progress accounting.
//! - [`access`]: the purchase/unlock gate.
//! - [`snapshot`]: the read-only job projection handed to clients.
//! - [`credentials`]: session credential issuance and callback signatures.

pub mod access;
pub mod credentials;
pub mod error;
pub mod hashing;
pub mod retention;
pub mod snapshot;
pub mod stage;
pub mod status;
pub mod types;
