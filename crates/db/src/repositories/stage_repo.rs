//! Applies stage engine commands to a job inside one transaction.
//!
//! The job row is locked with `SELECT ... FOR UPDATE` before the engine
//! runs, so concurrent callbacks for the same job are serialized while
//! callbacks for different jobs never contend. Result rows for different
//! variants are appended under the same lock, so no update is lost.

use sonogen_core::error::CoreError;
use sonogen_core::stage::{plan_advance, Advance, StageError, StageOutcome, VariantEffect};
use sonogen_core::status::JobStage;
use sonogen_core::types::{DbId, VariantIndex};
use sqlx::{PgConnection, PgPool};

use crate::models::job::Job;
use crate::repositories::job_repo::COLUMNS;

#[derive(Debug, thiserror::Error)]
pub enum StageApplyError {
    #[error("Job {0} not found")]
    JobNotFound(DbId),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Outcome of [`StageRepo::apply`].
#[derive(Debug, Clone)]
pub struct StageApplied {
    /// The job row after the step (unchanged for duplicates).
    pub job: Job,
    /// `false` when the callback had already been applied.
    pub applied: bool,
    /// Stages entered by this step, in order.
    pub stages_walked: Vec<JobStage>,
}

pub struct StageRepo;

impl StageRepo {
    /// Lock the job, run the stage engine, and persist the outcome.
    ///
    /// A rejected command rolls the transaction back, leaving the job
    /// exactly as it was.
    pub async fn apply(
        pool: &PgPool,
        job_id: DbId,
        advance: Advance,
    ) -> Result<StageApplied, StageApplyError> {
        let mut tx = pool.begin().await?;

        let lock = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 FOR UPDATE");
        let job = sqlx::query_as::<_, Job>(&lock)
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StageApplyError::JobNotFound(job_id))?;

        let succeeded = terminated_indexes(&mut *tx, "variant_results", job_id).await?;
        let failed = terminated_indexes(&mut *tx, "variant_failures", job_id).await?;
        let state = job.engine_state(succeeded, failed)?;

        let transition = match plan_advance(&state, advance)? {
            StageOutcome::Duplicate => {
                tx.commit().await?;
                return Ok(StageApplied {
                    job,
                    applied: false,
                    stages_walked: Vec::new(),
                });
            }
            StageOutcome::Applied(transition) => transition,
        };

        let mut primary: Option<(&str, Option<&str>, VariantIndex)> = None;
        match &transition.effect {
            Some(VariantEffect::Persist {
                variant_index,
                output,
                is_primary,
            }) => {
                sqlx::query(
                    "INSERT INTO variant_results \
                         (job_id, variant_index, variant_descriptor, result_ref, preview_ref, \
                          file_size_bytes, generation_time_ms, is_primary) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(job_id)
                .bind(variant_index)
                .bind(&output.variant_descriptor)
                .bind(&output.result_ref)
                .bind(&output.preview_ref)
                .bind(output.file_size_bytes)
                .bind(output.generation_time_ms)
                .bind(is_primary)
                .execute(&mut *tx)
                .await?;
                if *is_primary {
                    primary = Some((
                        output.result_ref.as_str(),
                        output.preview_ref.as_deref(),
                        *variant_index,
                    ));
                }
            }
            Some(VariantEffect::RecordFailure {
                variant_index,
                reason,
            }) => {
                sqlx::query(
                    "INSERT INTO variant_failures (job_id, variant_index, reason) \
                     VALUES ($1, $2, $3)",
                )
                .bind(job_id)
                .bind(variant_index)
                .bind(reason)
                .execute(&mut *tx)
                .await?;
            }
            None => {}
        }

        let next = &transition.next;
        let update = format!(
            "UPDATE jobs SET \
                 status_id = $2, \
                 stage_id = $3, \
                 progress = $4, \
                 workflow_run_ref = $5, \
                 error_message = $6, \
                 primary_result_ref = COALESCE($7, primary_result_ref), \
                 preview_ref = COALESCE($8, preview_ref), \
                 primary_variant_index = COALESCE($9, primary_variant_index), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&update)
            .bind(job_id)
            .bind(next.status.id())
            .bind(next.stage.map(JobStage::id))
            .bind(next.progress)
            .bind(&next.workflow_run_ref)
            .bind(&next.error_message)
            .bind(primary.map(|(result_ref, _, _)| result_ref))
            .bind(primary.and_then(|(_, preview_ref, _)| preview_ref))
            .bind(primary.map(|(_, _, index)| index))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            job_id = %job_id,
            stages = ?transition.stages_walked,
            progress = next.progress,
            "Stage step applied",
        );

        Ok(StageApplied {
            job,
            applied: true,
            stages_walked: transition.stages_walked,
        })
    }
}

async fn terminated_indexes(
    conn: &mut PgConnection,
    table: &str,
    job_id: DbId,
) -> Result<Vec<VariantIndex>, sqlx::Error> {
    let query =
        format!("SELECT variant_index FROM {table} WHERE job_id = $1 ORDER BY variant_index");
    sqlx::query_scalar::<_, VariantIndex>(&query)
        .bind(job_id)
        .fetch_all(conn)
        .await
}
