//! Builds the client-facing projections of a job.
//!
//! Access is resolved from the purchases table on every call, so a refund
//! takes effect on the very next request.

use sonogen_core::access::{resolve_access, Access};
use sonogen_core::snapshot::{JobSnapshot, ResultView};
use sonogen_core::types::VariantIndex;
use sonogen_db::models::job::Job;
use sonogen_db::models::result::VariantResult;
use sonogen_db::repositories::{PurchaseRepo, ResultRepo};
use sqlx::PgPool;

use crate::error::AppResult;
use crate::signer::StorageSigner;

/// Resolve which of `results` are unlocked for `job`.
pub async fn load_access(pool: &PgPool, job: &Job, results: &[VariantResult]) -> AppResult<Access> {
    let grants = PurchaseRepo::list_by_job(pool, job.id)
        .await?
        .iter()
        .map(|p| p.grant())
        .collect::<Result<Vec<_>, _>>()?;
    let indexes: Vec<VariantIndex> = results.iter().map(|r| r.variant_index).collect();
    Ok(resolve_access(job.primary_variant_index, &indexes, &grants))
}

/// The status-endpoint snapshot. The full-resolution URL is present only
/// when the primary variant is unlocked.
pub async fn job_snapshot(
    pool: &PgPool,
    signer: &dyn StorageSigner,
    job: &Job,
) -> AppResult<JobSnapshot> {
    let results = ResultRepo::list_by_job(pool, job.id).await?;
    let access = load_access(pool, job, &results).await?;
    let primary = results.iter().find(|r| r.is_primary);

    let result_url = match (job.primary_variant_index, &job.primary_result_ref) {
        (Some(index), Some(result_ref)) if access.is_unlocked(index) => {
            Some(signer.sign(result_ref))
        }
        _ => None,
    };

    Ok(JobSnapshot {
        job_id: job.id,
        status: job.status()?,
        stage: job.stage()?,
        progress: job.progress,
        result_url,
        preview_url: job.preview_ref.as_deref().map(|r| signer.sign(r)),
        original_url: Some(signer.sign(&job.source_image_ref)),
        prompt_version: job.prompt_version.clone(),
        error_message: job.error_message.clone(),
        result_id: primary.map(|r| r.id),
        updated_at: job.updated_at,
    })
}

/// One view per persisted variant; locked variants carry only the preview.
pub fn result_views(
    signer: &dyn StorageSigner,
    results: &[VariantResult],
    access: &Access,
) -> Vec<ResultView> {
    results
        .iter()
        .map(|r| {
            let unlocked = access.is_unlocked(r.variant_index);
            ResultView {
                id: r.id,
                variant_index: r.variant_index,
                variant_descriptor: r.variant_descriptor.clone(),
                is_primary: r.is_primary,
                unlocked,
                preview_url: r.preview_ref.as_deref().map(|p| signer.sign(p)),
                result_url: unlocked.then(|| signer.sign(&r.result_ref)),
                file_size_bytes: r.file_size_bytes,
                generation_time_ms: r.generation_time_ms,
                created_at: r.created_at,
            }
        })
        .collect()
}
