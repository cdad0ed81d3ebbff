//! Purchase rows and the gift/owner purchase DTOs.

use serde::{Deserialize, Serialize};
use sonogen_core::access::PurchaseGrant;
use sonogen_core::error::CoreError;
use sonogen_core::types::{DbId, Timestamp, VariantIndex};
use sqlx::FromRow;

use super::status::{PurchaseStatus, PurchaseTier, StatusId};

/// A row from the `purchases` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Purchase {
    pub id: DbId,
    pub job_id: DbId,
    pub status_id: StatusId,
    pub tier_id: StatusId,
    pub variant_index: Option<VariantIndex>,
    pub is_gift: bool,
    pub purchaser_email: Option<String>,
    pub gift_recipient_email: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub refunded_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Purchase {
    pub fn status(&self) -> Result<PurchaseStatus, CoreError> {
        PurchaseStatus::try_from(self.status_id)
    }

    pub fn tier(&self) -> Result<PurchaseTier, CoreError> {
        PurchaseTier::try_from(self.tier_id)
    }

    /// The fields the unlock gate evaluates.
    pub fn grant(&self) -> Result<PurchaseGrant, CoreError> {
        Ok(PurchaseGrant {
            status: self.status()?,
            tier: self.tier()?,
            variant_index: self.variant_index,
        })
    }
}

/// DTO for `POST /api/v1/jobs/{id}/purchases`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchase {
    pub tier: PurchaseTier,
    /// Single tier only. Omitted means the primary result.
    pub variant_index: Option<VariantIndex>,
    pub purchaser_email: Option<String>,
}

/// DTO for `POST /api/v1/gifts`. Keyed by job id alone: the purchaser never
/// holds the job's credential and never gains access themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGiftPurchase {
    pub job_id: DbId,
    pub tier: PurchaseTier,
    pub variant_index: Option<VariantIndex>,
    pub purchaser_email: String,
    pub gift_recipient_email: String,
}

/// Insert parameters shared by owner and gift purchases.
#[derive(Debug, Clone)]
pub struct NewPurchase<'a> {
    pub job_id: DbId,
    pub tier: PurchaseTier,
    pub variant_index: Option<VariantIndex>,
    pub is_gift: bool,
    pub purchaser_email: Option<&'a str>,
    pub gift_recipient_email: Option<&'a str>,
}
