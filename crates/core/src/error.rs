use crate::types::DbId;

/// Message shown whenever a caller presents a credential that does not
/// resolve to a live job. Deliberately identical for "wrong credential"
/// and "no such job".
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Your session has expired. Start fresh to upload again.";

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Credential mismatch, missing credential, or a job that no longer
    /// exists. Callers must not be able to tell these apart.
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
