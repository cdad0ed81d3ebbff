//! Repository for the `variant_results` and `variant_failures` tables.
//!
//! Inserts happen inside [`super::StageRepo::apply`]; this repo only reads.

use sonogen_core::types::{DbId, VariantIndex};
use sqlx::PgPool;

use crate::models::result::{VariantFailure, VariantResult};

pub(crate) const COLUMNS: &str = "\
    id, job_id, variant_index, variant_descriptor, result_ref, preview_ref, \
    file_size_bytes, generation_time_ms, is_primary, created_at";

pub struct ResultRepo;

impl ResultRepo {
    /// All results for a job in stable variant order.
    pub async fn list_by_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<VariantResult>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM variant_results WHERE job_id = $1 ORDER BY variant_index"
        );
        sqlx::query_as::<_, VariantResult>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_variant(
        pool: &PgPool,
        job_id: DbId,
        variant_index: VariantIndex,
    ) -> Result<Option<VariantResult>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM variant_results WHERE job_id = $1 AND variant_index = $2"
        );
        sqlx::query_as::<_, VariantResult>(&query)
            .bind(job_id)
            .bind(variant_index)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_failures(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<VariantFailure>, sqlx::Error> {
        sqlx::query_as::<_, VariantFailure>(
            "SELECT job_id, variant_index, reason, created_at \
             FROM variant_failures WHERE job_id = $1 ORDER BY variant_index",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await
    }
}
