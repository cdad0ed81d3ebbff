use serde::{Deserialize, Serialize};
use sonogen_core::types::{DbId, Timestamp, VariantIndex};
use sqlx::FromRow;

/// A row from the `job_preferences` table. Informational only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Preference {
    pub job_id: DbId,
    pub result_id: DbId,
    pub created_at: Timestamp,
}

/// DTO for `POST /api/v1/jobs/{id}/preference`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPreference {
    pub variant_index: VariantIndex,
}
