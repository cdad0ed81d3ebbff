//! Handler for recording which variant the user favored.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sonogen_core::error::CoreError;
use sonogen_core::types::DbId;
use sonogen_db::models::preference::RecordPreference;
use sonogen_db::repositories::{PreferenceRepo, ResultRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::session::SessionCredential;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/jobs/{id}/preference
///
/// Write-once. Informational only; never affects access.
pub async fn record_preference(
    credential: SessionCredential,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<RecordPreference>,
) -> AppResult<impl IntoResponse> {
    let job = credential.authorize(&state.pool, job_id).await?;
    let result = ResultRepo::find_by_variant(&state.pool, job.id, input.variant_index)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Variant {} has no result", input.variant_index))
        })?;

    let preference = PreferenceRepo::record(&state.pool, job.id, result.id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "A preference has already been recorded for this job".into(),
            ))
        })?;

    tracing::info!(job_id = %job.id, variant_index = input.variant_index, "Preference recorded");
    Ok((StatusCode::CREATED, Json(DataResponse { data: preference })))
}
