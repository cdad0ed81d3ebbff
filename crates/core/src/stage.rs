//! Job stage state machine (the stage engine).
//!
//! The engine is pure: [`plan_advance`] takes the current [`JobState`] and
//! one worker callback ([`Advance`]) and returns either
//!
//! - [`StageOutcome::Duplicate`]: the callback was already applied and
//!   nothing changes.
//! - [`StageOutcome::Applied`]: the complete next state plus the side
//!   effect to persist with it.
//! - a [`StageError`]: the callback is rejected and the caller must leave
//!   the job untouched.
//!
//! Persistence and per-job serialization live in the database layer; this
//! module only decides.
//!
//! Forward order: `pending → validating → generating → first_ready →
//! storing → watermarking → complete`. `failed` is reachable from every
//! non-terminal stage.

use crate::status::{JobStage, JobStatus};
use crate::types::VariantIndex;

// ---------------------------------------------------------------------------
// Progress constants
// ---------------------------------------------------------------------------

/// Progress once validation has started.
pub const PROGRESS_VALIDATING: i16 = 5;
/// Progress once generation has started, before any variant terminates.
pub const PROGRESS_GENERATING: i16 = 10;
/// Share of the progress bar spread across variant terminations.
pub const PROGRESS_VARIANT_SPAN: i16 = 70;
/// Floor once the remaining variants are being stored.
pub const PROGRESS_STORING: i16 = 85;
/// Floor once watermarking has started.
pub const PROGRESS_WATERMARKING: i16 = 92;
/// Progress of a completed job.
pub const PROGRESS_COMPLETE: i16 = 100;
/// Worker hints can never claim completion on their own.
pub const PROGRESS_HINT_CEILING: i16 = 99;

/// Minimum progress implied by having reached `stage`.
pub fn stage_floor(stage: JobStage) -> i16 {
    match stage {
        JobStage::Validating => PROGRESS_VALIDATING,
        JobStage::Generating | JobStage::FirstReady => PROGRESS_GENERATING,
        JobStage::Storing => PROGRESS_STORING,
        JobStage::Watermarking => PROGRESS_WATERMARKING,
        JobStage::Complete => PROGRESS_COMPLETE,
        JobStage::Failed => 0,
    }
}

/// Progress implied by `terminated` of `total` variants having finished
/// (successfully or not).
pub fn variant_progress(terminated: usize, total: i16) -> i16 {
    if total <= 0 {
        return PROGRESS_GENERATING;
    }
    let terminated = (terminated as i64).min(total as i64);
    let span = PROGRESS_VARIANT_SPAN as i64 * terminated / total as i64;
    PROGRESS_GENERATING + span as i16
}

// ---------------------------------------------------------------------------
// State and commands
// ---------------------------------------------------------------------------

/// Everything the engine needs to know about a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    pub status: JobStatus,
    /// `None` until validation begins.
    pub stage: Option<JobStage>,
    pub progress: i16,
    /// Bound by the first callback that carries a run reference.
    pub workflow_run_ref: Option<String>,
    /// Number of variants attempted (N).
    pub variant_count: i16,
    /// Indexes that produced a persisted result.
    pub succeeded_variants: Vec<VariantIndex>,
    /// Indexes whose generation failed individually.
    pub failed_variants: Vec<VariantIndex>,
    pub error_message: Option<String>,
}

impl JobState {
    /// A freshly uploaded job that has not started validating.
    pub fn pending(variant_count: i16) -> Self {
        Self {
            status: JobStatus::Pending,
            stage: None,
            progress: 0,
            workflow_run_ref: None,
            variant_count,
            succeeded_variants: Vec::new(),
            failed_variants: Vec::new(),
            error_message: None,
        }
    }

    pub fn terminated_variants(&self) -> usize {
        self.succeeded_variants.len() + self.failed_variants.len()
    }

    pub fn outstanding_variants(&self) -> i16 {
        (self.variant_count as usize).saturating_sub(self.terminated_variants()) as i16
    }

    fn has_terminated(&self, index: VariantIndex) -> bool {
        self.succeeded_variants.contains(&index) || self.failed_variants.contains(&index)
    }
}

/// Output of one successful variant generation, as reported by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOutput {
    pub result_ref: String,
    pub preview_ref: Option<String>,
    pub variant_descriptor: String,
    pub file_size_bytes: Option<i64>,
    pub generation_time_ms: Option<i64>,
}

/// The worker callback being applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageCommand {
    /// `onStageReached(stage)`.
    ReachStage(JobStage),
    /// `onVariantComplete(index, ...)`.
    VariantCompleted {
        variant_index: VariantIndex,
        output: VariantOutput,
    },
    /// One variant failed; the others may still succeed.
    VariantFailed {
        variant_index: VariantIndex,
        reason: String,
    },
    /// `onFailure(reason)`: unrecoverable upstream error.
    Fail { reason: String },
}

/// One callback plus its correlation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub workflow_run_ref: Option<String>,
    pub progress_hint: Option<i16>,
    pub command: StageCommand,
}

impl Advance {
    pub fn new(command: StageCommand) -> Self {
        Self {
            workflow_run_ref: None,
            progress_hint: None,
            command,
        }
    }

    pub fn with_run_ref(mut self, run_ref: impl Into<String>) -> Self {
        self.workflow_run_ref = Some(run_ref.into());
        self
    }

    pub fn with_progress_hint(mut self, hint: i16) -> Self {
        self.progress_hint = Some(hint);
        self
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Side effect the persistence layer must perform alongside the state write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantEffect {
    /// Append a result row. `is_primary` is set for the first success only.
    Persist {
        variant_index: VariantIndex,
        output: VariantOutput,
        is_primary: bool,
    },
    /// A variant failed individually; it is already in `next.failed_variants`.
    RecordFailure {
        variant_index: VariantIndex,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: JobState,
    /// Stages entered by this step, in order. Empty when the stage is
    /// unchanged (e.g. a later variant finishing).
    pub stages_walked: Vec<JobStage>,
    pub effect: Option<VariantEffect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Already applied; the job is unchanged.
    Duplicate,
    Applied(Transition),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("Invalid transition from {} to {requested}", stage_label(.from))]
    InvalidTransition {
        from: Option<JobStage>,
        requested: String,
    },

    #[error("Callback from workflow run '{presented}' but job is bound to run '{bound}'")]
    StaleRun { bound: String, presented: String },

    #[error("Cannot complete: {outstanding} variant(s) have not terminated")]
    VariantsOutstanding { outstanding: i16 },

    #[error("Variant index {index} is outside 0..{count}")]
    UnknownVariant {
        index: VariantIndex,
        count: i16,
    },
}

fn stage_label(stage: &Option<JobStage>) -> &'static str {
    stage.map(JobStage::as_str).unwrap_or("pending")
}

fn invalid(from: Option<JobStage>, requested: impl Into<String>) -> StageError {
    StageError::InvalidTransition {
        from,
        requested: requested.into(),
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Decide what one worker callback does to a job.
///
/// Never mutates `state`; the caller persists `Transition::next` only when
/// the outcome is `Applied`.
pub fn plan_advance(state: &JobState, advance: Advance) -> Result<StageOutcome, StageError> {
    let Advance {
        workflow_run_ref,
        progress_hint,
        command,
    } = advance;

    if let (Some(bound), Some(presented)) = (&state.workflow_run_ref, &workflow_run_ref) {
        if bound != presented {
            return Err(StageError::StaleRun {
                bound: bound.clone(),
                presented: presented.clone(),
            });
        }
    }

    let same_run = state.workflow_run_ref.is_some() && workflow_run_ref == state.workflow_run_ref;

    let outcome = match command {
        StageCommand::ReachStage(JobStage::Failed) => fail(
            state,
            "The generation worker reported a failure".to_string(),
        )?,
        StageCommand::ReachStage(target) => reach_stage(state, target, same_run)?,
        StageCommand::VariantCompleted {
            variant_index,
            output,
        } => variant_completed(state, variant_index, output)?,
        StageCommand::VariantFailed {
            variant_index,
            reason,
        } => variant_failed(state, variant_index, reason)?,
        StageCommand::Fail { reason } => fail(state, reason)?,
    };

    Ok(match outcome {
        StageOutcome::Duplicate => StageOutcome::Duplicate,
        StageOutcome::Applied(mut transition) => {
            if transition.next.workflow_run_ref.is_none() {
                transition.next.workflow_run_ref = workflow_run_ref;
            }
            apply_hint(&mut transition.next, progress_hint);
            StageOutcome::Applied(transition)
        }
    })
}

/// `same_run` is true when the callback carries the run ref the job is
/// bound to. Only such a callback may redeliver a stage already walked.
fn reach_stage(
    state: &JobState,
    target: JobStage,
    same_run: bool,
) -> Result<StageOutcome, StageError> {
    if state.stage == Some(target) {
        return Ok(StageOutcome::Duplicate);
    }
    if same_run && already_walked(state.stage, target) {
        return Ok(StageOutcome::Duplicate);
    }
    if state.status.is_terminal() {
        return Err(invalid(state.stage, target.as_str()));
    }

    match target {
        JobStage::Complete => complete(state),
        // Only the first persisted variant moves a job into first_ready.
        JobStage::FirstReady => Err(invalid(state.stage, target.as_str())),
        _ if JobStage::successor(state.stage) == Some(target) => {
            let mut next = state.clone();
            next.stage = Some(target);
            next.status = JobStatus::Processing;
            next.progress = next.progress.max(stage_floor(target));
            Ok(StageOutcome::Applied(Transition {
                next,
                stages_walked: vec![target],
                effect: None,
            }))
        }
        _ => Err(invalid(state.stage, target.as_str())),
    }
}

/// Whether the forward path up to `current` went through `target`. A
/// failed job's path is unknown past the point of failure.
fn already_walked(current: Option<JobStage>, target: JobStage) -> bool {
    match current {
        Some(JobStage::Failed) | None => false,
        Some(current) => target < current,
    }
}

/// Finish the job, walking any intermediate stages still ahead of it so the
/// recorded path follows the forward order.
fn complete(state: &JobState) -> Result<StageOutcome, StageError> {
    let Some(current) = state.stage else {
        return Err(invalid(None, JobStage::Complete.as_str()));
    };
    if current < JobStage::FirstReady {
        return Err(invalid(state.stage, JobStage::Complete.as_str()));
    }

    let outstanding = state.outstanding_variants();
    if outstanding > 0 {
        return Err(StageError::VariantsOutstanding { outstanding });
    }
    if state.succeeded_variants.is_empty() {
        return fail(state, total_failure_message(state.variant_count));
    }

    let mut stages_walked = Vec::new();
    let mut cursor = Some(current);
    while let Some(next) = JobStage::successor(cursor) {
        stages_walked.push(next);
        cursor = Some(next);
    }

    let mut next = state.clone();
    next.stage = Some(JobStage::Complete);
    next.status = JobStatus::Completed;
    next.progress = PROGRESS_COMPLETE;
    Ok(StageOutcome::Applied(Transition {
        next,
        stages_walked,
        effect: None,
    }))
}

/// Shared checks for both variant callbacks. `Ok(None)` means duplicate.
fn check_variant(
    state: &JobState,
    variant_index: VariantIndex,
    requested: &str,
) -> Result<Option<()>, StageError> {
    if variant_index < 0 || variant_index >= state.variant_count {
        return Err(StageError::UnknownVariant {
            index: variant_index,
            count: state.variant_count,
        });
    }
    if state.has_terminated(variant_index) {
        return Ok(None);
    }
    match state.stage {
        Some(stage) if stage.accepts_variants() => Ok(Some(())),
        other => Err(invalid(other, format!("{requested} for variant {variant_index}"))),
    }
}

fn variant_completed(
    state: &JobState,
    variant_index: VariantIndex,
    output: VariantOutput,
) -> Result<StageOutcome, StageError> {
    if check_variant(state, variant_index, "result")?.is_none() {
        return Ok(StageOutcome::Duplicate);
    }

    let mut next = state.clone();
    next.succeeded_variants.push(variant_index);
    next.succeeded_variants.sort_unstable();

    let is_primary = state.succeeded_variants.is_empty();
    let mut stages_walked = Vec::new();
    if state.stage == Some(JobStage::Generating) {
        next.stage = Some(JobStage::FirstReady);
        stages_walked.push(JobStage::FirstReady);
    }
    next.progress = next
        .progress
        .max(variant_progress(next.terminated_variants(), next.variant_count));

    Ok(StageOutcome::Applied(Transition {
        next,
        stages_walked,
        effect: Some(VariantEffect::Persist {
            variant_index,
            output,
            is_primary,
        }),
    }))
}

fn variant_failed(
    state: &JobState,
    variant_index: VariantIndex,
    reason: String,
) -> Result<StageOutcome, StageError> {
    if check_variant(state, variant_index, "failure")?.is_none() {
        return Ok(StageOutcome::Duplicate);
    }

    let mut next = state.clone();
    next.failed_variants.push(variant_index);
    next.failed_variants.sort_unstable();
    let effect = Some(VariantEffect::RecordFailure {
        variant_index,
        reason,
    });

    if next.outstanding_variants() == 0 && next.succeeded_variants.is_empty() {
        let message = total_failure_message(next.variant_count);
        mark_failed(&mut next, message);
        return Ok(StageOutcome::Applied(Transition {
            next,
            stages_walked: vec![JobStage::Failed],
            effect,
        }));
    }

    next.progress = next
        .progress
        .max(variant_progress(next.terminated_variants(), next.variant_count));
    Ok(StageOutcome::Applied(Transition {
        next,
        stages_walked: Vec::new(),
        effect,
    }))
}

fn fail(state: &JobState, reason: String) -> Result<StageOutcome, StageError> {
    match state.status {
        JobStatus::Failed => Ok(StageOutcome::Duplicate),
        JobStatus::Completed => Err(invalid(state.stage, JobStage::Failed.as_str())),
        JobStatus::Pending | JobStatus::Processing => {
            let mut next = state.clone();
            mark_failed(&mut next, reason);
            Ok(StageOutcome::Applied(Transition {
                next,
                stages_walked: vec![JobStage::Failed],
                effect: None,
            }))
        }
    }
}

fn mark_failed(state: &mut JobState, reason: String) {
    state.status = JobStatus::Failed;
    state.stage = Some(JobStage::Failed);
    state.error_message = Some(if reason.trim().is_empty() {
        "Generation failed".to_string()
    } else {
        reason
    });
}

fn total_failure_message(variant_count: i16) -> String {
    format!("All {variant_count} variants failed")
}

/// Worker hints may move progress forward within the current stage but can
/// neither regress it nor claim completion.
fn apply_hint(state: &mut JobState, hint: Option<i16>) {
    if state.status.is_terminal() {
        return;
    }
    if let Some(hint) = hint {
        state.progress = state.progress.max(hint.clamp(0, PROGRESS_HINT_CEILING));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
