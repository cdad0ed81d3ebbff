//! Generation worker callbacks.
//!
//! Delivery is at-least-once and unordered across variants. Each handler
//! translates its payload into a stage engine command; duplicates answer
//! `200` with `applied: false`.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sonogen_core::stage::{Advance, StageCommand, VariantOutput};
use sonogen_core::status::{JobStage, JobStatus};
use sonogen_core::types::{DbId, VariantIndex};
use sonogen_db::StageApplied;

use crate::engine::callbacks::apply_callback;
use crate::error::AppResult;
use crate::middleware::signature::SignedJson;
use crate::response::DataResponse;
use crate::state::AppState;

/// Fields every worker callback may carry.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackMeta {
    pub workflow_run_ref: Option<String>,
    /// Worker's own progress estimate (clamped by the engine).
    pub progress: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct StageReached {
    pub stage: JobStage,
    #[serde(flatten)]
    pub meta: CallbackMeta,
}

#[derive(Debug, Deserialize)]
pub struct VariantCompleted {
    pub result_ref: String,
    pub preview_ref: Option<String>,
    pub variant_descriptor: String,
    pub file_size_bytes: Option<i64>,
    pub timing_ms: Option<i64>,
    #[serde(flatten)]
    pub meta: CallbackMeta,
}

#[derive(Debug, Deserialize)]
pub struct Failure {
    pub reason: String,
    #[serde(flatten)]
    pub meta: CallbackMeta,
}

/// What the worker gets back.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub applied: bool,
    pub status: JobStatus,
    pub stage: Option<JobStage>,
    pub progress: i16,
}

fn advance(meta: CallbackMeta, command: StageCommand) -> Advance {
    Advance {
        workflow_run_ref: meta.workflow_run_ref,
        progress_hint: meta.progress,
        command,
    }
}

fn ack(applied: StageApplied) -> AppResult<Json<DataResponse<CallbackAck>>> {
    Ok(Json(DataResponse {
        data: CallbackAck {
            applied: applied.applied,
            status: applied.job.status()?,
            stage: applied.job.stage()?,
            progress: applied.job.progress,
        },
    }))
}

/// POST /api/v1/callbacks/jobs/{id}/stage
pub async fn stage_reached(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    SignedJson(body): SignedJson<StageReached>,
) -> AppResult<impl IntoResponse> {
    let applied = apply_callback(
        &state.pool,
        job_id,
        advance(body.meta, StageCommand::ReachStage(body.stage)),
    )
    .await?;
    ack(applied)
}

/// POST /api/v1/callbacks/jobs/{id}/variants/{variant_index}/completed
pub async fn variant_completed(
    State(state): State<AppState>,
    Path((job_id, variant_index)): Path<(DbId, VariantIndex)>,
    SignedJson(body): SignedJson<VariantCompleted>,
) -> AppResult<impl IntoResponse> {
    let command = StageCommand::VariantCompleted {
        variant_index,
        output: VariantOutput {
            result_ref: body.result_ref,
            preview_ref: body.preview_ref,
            variant_descriptor: body.variant_descriptor,
            file_size_bytes: body.file_size_bytes,
            generation_time_ms: body.timing_ms,
        },
    };
    let applied = apply_callback(&state.pool, job_id, advance(body.meta, command)).await?;
    ack(applied)
}

/// POST /api/v1/callbacks/jobs/{id}/variants/{variant_index}/failed
pub async fn variant_failed(
    State(state): State<AppState>,
    Path((job_id, variant_index)): Path<(DbId, VariantIndex)>,
    SignedJson(body): SignedJson<Failure>,
) -> AppResult<impl IntoResponse> {
    let command = StageCommand::VariantFailed {
        variant_index,
        reason: body.reason,
    };
    let applied = apply_callback(&state.pool, job_id, advance(body.meta, command)).await?;
    ack(applied)
}

/// POST /api/v1/callbacks/jobs/{id}/failure
///
/// Unrecoverable upstream error for the whole job.
pub async fn job_failed(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    SignedJson(body): SignedJson<Failure>,
) -> AppResult<impl IntoResponse> {
    let command = StageCommand::Fail {
        reason: body.reason,
    };
    let applied = apply_callback(&state.pool, job_id, advance(body.meta, command)).await?;
    ack(applied)
}
