//! Session credential extractor.
//!
//! There are no accounts: the credential issued at upload is the only proof
//! of control over a job. Every failure here surfaces as
//! [`CoreError::SessionExpired`], whether the header is missing, the
//! credential is wrong, or the job no longer exists.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sonogen_core::credentials::hash_credential;
use sonogen_core::error::CoreError;
use sonogen_core::types::DbId;
use sonogen_db::models::job::Job;
use sonogen_db::repositories::JobRepo;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Header carrying the session credential.
pub const SESSION_HEADER: &str = "x-session-token";

/// The credential presented with a request. Only the digest is kept.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    hash: String,
}

impl SessionCredential {
    /// Load the job this credential controls.
    pub async fn authorize(&self, pool: &PgPool, job_id: DbId) -> AppResult<Job> {
        JobRepo::find_by_credential(pool, job_id, &self.hash)
            .await?
            .ok_or(AppError::Core(CoreError::SessionExpired))
    }
}

impl FromRequestParts<AppState> for SessionCredential {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Core(CoreError::SessionExpired))?;

        Ok(SessionCredential {
            hash: hash_credential(credential),
        })
    }
}
