use sonogen_core::error::SESSION_EXPIRED_MESSAGE;

/// Errors surfaced by the client crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server no longer recognizes the job/credential pair. Covers a
    /// wrong credential, a deleted job, and an expired one alike.
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an unexpected non-2xx status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Failed to decode: {0}")]
    Decode(#[from] serde_json::Error),
}
