//! Job rows: one per uploaded source image.

use serde::{Deserialize, Serialize};
use sonogen_core::error::CoreError;
use sonogen_core::stage::JobState;
use sonogen_core::types::{DbId, Timestamp, VariantIndex};
use sqlx::FromRow;

use super::status::{JobStage, JobStatus, StatusId};

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub email: String,
    #[serde(skip_serializing)]
    pub session_credential_hash: String,
    pub source_image_ref: String,
    pub prompt_version: Option<String>,
    pub primary_result_ref: Option<String>,
    pub preview_ref: Option<String>,
    pub primary_variant_index: Option<VariantIndex>,
    pub status_id: StatusId,
    /// `NULL` until validation begins.
    pub stage_id: Option<StatusId>,
    pub progress: i16,
    pub workflow_run_ref: Option<String>,
    pub variant_count: i16,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Job {
    pub fn status(&self) -> Result<JobStatus, CoreError> {
        JobStatus::try_from(self.status_id)
    }

    pub fn stage(&self) -> Result<Option<JobStage>, CoreError> {
        self.stage_id.map(JobStage::try_from).transpose()
    }

    /// Build the stage engine's view of this job from the row plus the
    /// variant indexes that have already terminated.
    pub fn engine_state(
        &self,
        succeeded_variants: Vec<VariantIndex>,
        failed_variants: Vec<VariantIndex>,
    ) -> Result<JobState, CoreError> {
        Ok(JobState {
            status: self.status()?,
            stage: self.stage()?,
            progress: self.progress,
            workflow_run_ref: self.workflow_run_ref.clone(),
            variant_count: self.variant_count,
            succeeded_variants,
            failed_variants,
            error_message: self.error_message.clone(),
        })
    }
}

/// DTO for `POST /api/v1/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJob {
    pub email: String,
    pub source_image_ref: String,
    pub prompt_version: Option<String>,
}
