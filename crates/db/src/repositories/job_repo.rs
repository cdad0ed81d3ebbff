//! Repository for the `jobs` table.
//!
//! Stage, status and progress are never written here; every lifecycle
//! mutation goes through [`super::StageRepo::apply`].

use sonogen_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{CreateJob, Job};
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
pub(crate) const COLUMNS: &str = "\
    id, email, session_credential_hash, source_image_ref, prompt_version, \
    primary_result_ref, preview_ref, primary_variant_index, \
    status_id, stage_id, progress, workflow_run_ref, variant_count, error_message, \
    created_at, updated_at, expires_at";

pub struct JobRepo;

impl JobRepo {
    /// Insert a new pending job. `credential_hash` is the SHA-256 digest of
    /// the credential returned to the uploader.
    pub async fn create(
        pool: &PgPool,
        input: &CreateJob,
        credential_hash: &str,
        variant_count: i16,
        expires_at: Timestamp,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs \
                 (email, session_credential_hash, source_image_ref, prompt_version, \
                  status_id, variant_count, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(&input.email)
            .bind(credential_hash)
            .bind(&input.source_image_ref)
            .bind(&input.prompt_version)
            .bind(JobStatus::Pending.id())
            .bind(variant_count)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job only if `credential_hash` matches exactly.
    ///
    /// Returns `None` both for an unknown id and for a wrong credential.
    pub async fn find_by_credential(
        pool: &PgPool,
        id: DbId,
        credential_hash: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE id = $1 AND session_credential_hash = $2"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(credential_hash)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a job. Results, failures, purchases and the preference
    /// cascade. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every job whose retention horizon is at or before `now`.
    pub async fn delete_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
