//! Repository for the `job_preferences` table.

use sonogen_core::types::DbId;
use sqlx::PgPool;

use crate::models::preference::Preference;

pub struct PreferenceRepo;

impl PreferenceRepo {
    /// Record the favored result. Write-once: returns `None` if the job
    /// already has a preference.
    pub async fn record(
        pool: &PgPool,
        job_id: DbId,
        result_id: DbId,
    ) -> Result<Option<Preference>, sqlx::Error> {
        sqlx::query_as::<_, Preference>(
            "INSERT INTO job_preferences (job_id, result_id) VALUES ($1, $2) \
             ON CONFLICT (job_id) DO NOTHING \
             RETURNING job_id, result_id, created_at",
        )
        .bind(job_id)
        .bind(result_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Option<Preference>, sqlx::Error> {
        sqlx::query_as::<_, Preference>(
            "SELECT job_id, result_id, created_at FROM job_preferences WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(pool)
        .await
    }
}
