//! Handlers for the `/jobs` resource: upload, status, deletion.
//!
//! Everything except creation requires the job's session credential.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use sonogen_core::credentials::generate_session_credential;
use sonogen_core::error::CoreError;
use sonogen_core::retention::expires_at;
use sonogen_core::status::JobStatus;
use sonogen_core::types::{DbId, Timestamp};
use sonogen_db::models::job::CreateJob;
use sonogen_db::repositories::JobRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::session::SessionCredential;
use crate::projection::job_snapshot;
use crate::response::DataResponse;
use crate::state::AppState;

/// Returned exactly once, at upload time.
#[derive(Debug, Serialize)]
pub struct CreatedJob {
    pub id: DbId,
    pub session_credential: String,
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

fn validate_create(input: &CreateJob) -> AppResult<()> {
    let email = input.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Core(CoreError::Validation(
            "A valid email address is required".into(),
        )));
    }
    if input.source_image_ref.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "source_image_ref must not be empty".into(),
        )));
    }
    Ok(())
}

/// POST /api/v1/jobs
///
/// Register an uploaded source image as a new pending job and issue its
/// session credential. Only the credential's digest is stored.
pub async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> AppResult<impl IntoResponse> {
    validate_create(&input)?;

    let issued = generate_session_credential();
    let expires = expires_at(Utc::now(), state.config.retention_days);
    let job = JobRepo::create(
        &state.pool,
        &input,
        &issued.hash,
        state.config.variant_count,
        expires,
    )
    .await?;

    tracing::info!(job_id = %job.id, variant_count = job.variant_count, "Job created");

    let created = CreatedJob {
        id: job.id,
        session_credential: issued.plaintext,
        status: job.status()?,
        created_at: job.created_at,
        expires_at: job.expires_at,
    };
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/jobs/{id}/status
///
/// Current snapshot of the job. Side-effect free; safe to poll.
pub async fn get_status(
    credential: SessionCredential,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = credential.authorize(&state.pool, job_id).await?;
    let snapshot = job_snapshot(&state.pool, state.signer.as_ref(), &job).await?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// DELETE /api/v1/jobs/{id}
///
/// Delete the job and everything that hangs off it.
pub async fn delete_job(
    credential: SessionCredential,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = credential.authorize(&state.pool, job_id).await?;
    JobRepo::delete(&state.pool, job.id).await?;

    tracing::info!(job_id = %job.id, "Job deleted on request");
    Ok(StatusCode::NO_CONTENT)
}
