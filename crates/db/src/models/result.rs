//! Variant result rows. Append-only.

use serde::Serialize;
use sonogen_core::types::{DbId, Timestamp, VariantIndex};
use sqlx::FromRow;

/// A row from the `variant_results` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VariantResult {
    pub id: DbId,
    pub job_id: DbId,
    pub variant_index: VariantIndex,
    pub variant_descriptor: String,
    pub result_ref: String,
    pub preview_ref: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub generation_time_ms: Option<i64>,
    pub is_primary: bool,
    pub created_at: Timestamp,
}

/// A row from the `variant_failures` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VariantFailure {
    pub job_id: DbId,
    pub variant_index: VariantIndex,
    pub reason: String,
    pub created_at: Timestamp,
}
