//! Read-only projections returned by the status and results endpoints and
//! consumed by the client.
//!
//! URLs here are always short-lived signed URLs, never storage references.

use serde::{Deserialize, Serialize};

use crate::status::{JobStage, JobStatus};
use crate::types::{DbId, Timestamp, VariantIndex};

/// Current state of one job, as seen by the holder of its credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: DbId,
    pub status: JobStatus,
    pub stage: Option<JobStage>,
    pub progress: i16,
    /// Full-resolution primary result. Only present once unlocked.
    pub result_url: Option<String>,
    /// Watermarked preview of the primary result.
    pub preview_url: Option<String>,
    /// The uploaded source image.
    pub original_url: Option<String>,
    pub prompt_version: Option<String>,
    pub error_message: Option<String>,
    /// Id of the primary result row, once one exists.
    pub result_id: Option<DbId>,
    pub updated_at: Timestamp,
}

impl JobSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One variant in the results listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultView {
    pub id: DbId,
    pub variant_index: VariantIndex,
    pub variant_descriptor: String,
    pub is_primary: bool,
    pub unlocked: bool,
    pub preview_url: Option<String>,
    /// `None` unless `unlocked`.
    pub result_url: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub generation_time_ms: Option<i64>,
    pub created_at: Timestamp,
}
