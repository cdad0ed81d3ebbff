//! Handlers for purchases, gifts, and payment-provider callbacks.
//!
//! Purchases are created `pending`; only the payment callbacks move them.
//! Gifts are keyed by job id alone and always unlock for the job's owner.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use sonogen_core::error::CoreError;
use sonogen_core::status::{JobStatus, PurchaseStatus, PurchaseTier};
use sonogen_core::types::{DbId, VariantIndex};
use sonogen_db::models::job::Job;
use sonogen_db::models::purchase::{CreateGiftPurchase, CreatePurchase, NewPurchase, Purchase};
use sonogen_db::repositories::{JobRepo, PurchaseRepo, ResultRepo};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::middleware::session::SessionCredential;
use crate::middleware::signature::SignedJson;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A purchase must target a job that has produced something, and a single
/// variant that actually exists.
async fn validate_target(
    pool: &PgPool,
    job: &Job,
    tier: PurchaseTier,
    variant_index: Option<VariantIndex>,
) -> AppResult<()> {
    if job.status()? == JobStatus::Failed {
        return Err(AppError::Core(CoreError::Conflict(
            "Cannot purchase results of a failed job".into(),
        )));
    }
    if job.primary_result_ref.is_none() {
        return Err(AppError::Core(CoreError::Conflict(
            "No result is available to purchase yet".into(),
        )));
    }
    match (tier, variant_index) {
        (PurchaseTier::All, Some(_)) => Err(AppError::Core(CoreError::Validation(
            "variant_index is only valid for the single tier".into(),
        ))),
        (PurchaseTier::Single, Some(index)) => {
            ResultRepo::find_by_variant(pool, job.id, index)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Variant {index} has no result")))?;
            Ok(())
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/purchases
///
/// Start a purchase by the job's owner.
pub async fn create_purchase(
    credential: SessionCredential,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<CreatePurchase>,
) -> AppResult<impl IntoResponse> {
    let job = credential.authorize(&state.pool, job_id).await?;
    validate_target(&state.pool, &job, input.tier, input.variant_index).await?;

    let purchase = PurchaseRepo::create(
        &state.pool,
        &NewPurchase {
            job_id: job.id,
            tier: input.tier,
            variant_index: input.variant_index,
            is_gift: false,
            purchaser_email: input.purchaser_email.as_deref(),
            gift_recipient_email: None,
        },
    )
    .await?;

    tracing::info!(
        job_id = %job.id,
        purchase_id = %purchase.id,
        tier = %input.tier,
        "Purchase started",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: purchase })))
}

/// POST /api/v1/gifts
///
/// Start a gift purchase for someone else's job. No credential is needed
/// and none is granted: the unlock applies to the job's owner.
pub async fn create_gift(
    State(state): State<AppState>,
    Json(input): Json<CreateGiftPurchase>,
) -> AppResult<impl IntoResponse> {
    if !input.gift_recipient_email.contains('@') || !input.purchaser_email.contains('@') {
        return Err(AppError::Core(CoreError::Validation(
            "Gift purchases need valid purchaser and recipient emails".into(),
        )));
    }

    let job = JobRepo::find_by_id(&state.pool, input.job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: input.job_id,
        }))?;
    validate_target(&state.pool, &job, input.tier, input.variant_index).await?;

    let purchase = PurchaseRepo::create(
        &state.pool,
        &NewPurchase {
            job_id: job.id,
            tier: input.tier,
            variant_index: input.variant_index,
            is_gift: true,
            purchaser_email: Some(&input.purchaser_email),
            gift_recipient_email: Some(&input.gift_recipient_email),
        },
    )
    .await?;

    tracing::info!(job_id = %job.id, purchase_id = %purchase.id, "Gift purchase started");
    Ok((StatusCode::CREATED, Json(DataResponse { data: purchase })))
}

// ---------------------------------------------------------------------------
// Payment callbacks
// ---------------------------------------------------------------------------

/// Body of a payment-provider callback. Signed like worker callbacks.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentNotice {
    pub reason: Option<String>,
}

/// Apply a guarded status change. Redelivery of the same outcome returns
/// the current row; any other mismatch is a conflict.
async fn settle(
    pool: &PgPool,
    purchase_id: DbId,
    from: &[PurchaseStatus],
    to: PurchaseStatus,
) -> AppResult<Purchase> {
    if let Some(updated) = PurchaseRepo::transition(pool, purchase_id, from, to).await? {
        tracing::info!(
            purchase_id = %purchase_id,
            job_id = %updated.job_id,
            status = %to,
            "Purchase settled",
        );
        return Ok(updated);
    }

    let current = PurchaseRepo::find_by_id(pool, purchase_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Purchase",
            id: purchase_id,
        }))?;
    let status = current.status()?;
    if status == to {
        tracing::debug!(purchase_id = %purchase_id, status = %to, "Duplicate payment callback");
        return Ok(current);
    }

    tracing::warn!(
        purchase_id = %purchase_id,
        current = %status,
        requested = %to,
        "Payment callback conflicts with purchase status",
    );
    Err(AppError::Core(CoreError::Conflict(format!(
        "Purchase is {status}; cannot mark it {to}"
    ))))
}

/// POST /api/v1/callbacks/purchases/{id}/completed
pub async fn purchase_completed(
    State(state): State<AppState>,
    Path(purchase_id): Path<DbId>,
    SignedJson(_notice): SignedJson<PaymentNotice>,
) -> AppResult<impl IntoResponse> {
    let purchase = settle(
        &state.pool,
        purchase_id,
        &[PurchaseStatus::Pending],
        PurchaseStatus::Completed,
    )
    .await?;
    Ok(Json(DataResponse { data: purchase }))
}

/// POST /api/v1/callbacks/purchases/{id}/refunded
///
/// Revokes access on the next access check; nothing is cached.
pub async fn purchase_refunded(
    State(state): State<AppState>,
    Path(purchase_id): Path<DbId>,
    SignedJson(_notice): SignedJson<PaymentNotice>,
) -> AppResult<impl IntoResponse> {
    let purchase = settle(
        &state.pool,
        purchase_id,
        &[PurchaseStatus::Completed],
        PurchaseStatus::Refunded,
    )
    .await?;
    Ok(Json(DataResponse { data: purchase }))
}

/// POST /api/v1/callbacks/purchases/{id}/failed
pub async fn purchase_failed(
    State(state): State<AppState>,
    Path(purchase_id): Path<DbId>,
    SignedJson(notice): SignedJson<PaymentNotice>,
) -> AppResult<impl IntoResponse> {
    if let Some(reason) = &notice.reason {
        tracing::info!(purchase_id = %purchase_id, reason = %reason, "Payment failed");
    }
    let purchase = settle(
        &state.pool,
        purchase_id,
        &[PurchaseStatus::Pending],
        PurchaseStatus::Failed,
    )
    .await?;
    Ok(Json(DataResponse { data: purchase }))
}
