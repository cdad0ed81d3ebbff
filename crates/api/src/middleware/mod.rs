//! Request extractors.
//!
//! - [`session::SessionCredential`]: the job's session credential from the
//!   `x-session-token` header.
//! - [`signature::SignedJson`]: a JSON body whose HMAC signature matches the
//!   shared callback secret.

pub mod session;
pub mod signature;
