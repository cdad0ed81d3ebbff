//! Handlers for listing and downloading variant results.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sonogen_core::types::{DbId, VariantIndex};
use sonogen_db::repositories::ResultRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::session::SessionCredential;
use crate::projection::{load_access, result_views};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DownloadLink {
    pub variant_index: VariantIndex,
    pub url: String,
    pub expires_in_secs: u64,
}

/// GET /api/v1/jobs/{id}/results
///
/// Every persisted variant with its watermarked preview. Full-resolution
/// URLs are included only for unlocked variants.
pub async fn list_results(
    credential: SessionCredential,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = credential.authorize(&state.pool, job_id).await?;
    let results = ResultRepo::list_by_job(&state.pool, job.id).await?;
    let access = load_access(&state.pool, &job, &results).await?;

    let views = result_views(state.signer.as_ref(), &results, &access);
    Ok(Json(DataResponse { data: views }))
}

/// GET /api/v1/jobs/{id}/results/{variant_index}/download
///
/// A signed full-resolution URL, or `403 LOCKED` when not purchased.
pub async fn download_result(
    credential: SessionCredential,
    State(state): State<AppState>,
    Path((job_id, variant_index)): Path<(DbId, VariantIndex)>,
) -> AppResult<impl IntoResponse> {
    let job = credential.authorize(&state.pool, job_id).await?;
    let results = ResultRepo::list_by_job(&state.pool, job.id).await?;
    let result = results
        .iter()
        .find(|r| r.variant_index == variant_index)
        .ok_or_else(|| AppError::NotFound(format!("Variant {variant_index} has no result")))?;

    let access = load_access(&state.pool, &job, &results).await?;
    if !access.is_unlocked(variant_index) {
        return Err(AppError::Locked(variant_index));
    }

    tracing::info!(job_id = %job.id, variant_index, "Full-resolution download issued");

    let link = DownloadLink {
        variant_index,
        url: state.signer.sign(&result.result_ref),
        expires_in_secs: state.signer.ttl_secs(),
    };
    Ok(Json(DataResponse { data: link }))
}
