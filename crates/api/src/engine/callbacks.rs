//! Applies worker callbacks to jobs and logs the outcome.
//!
//! Rejections never mutate the job; they are logged at `warn` and returned
//! to the worker so it can tell a stale or out-of-order delivery apart from
//! success.

use sonogen_core::stage::Advance;
use sonogen_core::status::{JobStage, JobStatus};
use sonogen_core::types::DbId;
use sonogen_db::repositories::StageRepo;
use sonogen_db::{StageApplied, StageApplyError};
use sqlx::PgPool;

use crate::error::AppResult;

/// Run one callback through [`StageRepo::apply`].
pub async fn apply_callback(
    pool: &PgPool,
    job_id: DbId,
    advance: Advance,
) -> AppResult<StageApplied> {
    let command = format!("{:?}", advance.command);
    match StageRepo::apply(pool, job_id, advance).await {
        Ok(applied) => {
            log_applied(job_id, &applied);
            Ok(applied)
        }
        Err(StageApplyError::Stage(e)) => {
            tracing::warn!(
                job_id = %job_id,
                command = %command,
                error = %e,
                "Worker callback rejected",
            );
            Err(e.into())
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Failed to apply worker callback");
            Err(e.into())
        }
    }
}

fn log_applied(job_id: DbId, applied: &StageApplied) {
    if !applied.applied {
        tracing::debug!(job_id = %job_id, "Duplicate worker callback ignored");
        return;
    }

    for stage in &applied.stages_walked {
        match stage {
            JobStage::FirstReady => {
                tracing::info!(job_id = %job_id, "First variant ready");
            }
            JobStage::Failed => {
                tracing::warn!(
                    job_id = %job_id,
                    error = applied.job.error_message.as_deref().unwrap_or_default(),
                    "Job failed",
                );
            }
            other => {
                tracing::info!(job_id = %job_id, stage = %other, "Job stage reached");
            }
        }
    }

    if applied.job.status().ok() == Some(JobStatus::Completed) {
        tracing::info!(job_id = %job_id, "Job completed");
    }
}
