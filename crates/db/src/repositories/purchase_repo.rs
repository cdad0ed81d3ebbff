//! Repository for the `purchases` table.

use sonogen_core::types::DbId;
use sqlx::PgPool;

use crate::models::purchase::{NewPurchase, Purchase};
use crate::models::status::{PurchaseStatus, StatusId};

const COLUMNS: &str = "\
    id, job_id, status_id, tier_id, variant_index, is_gift, \
    purchaser_email, gift_recipient_email, completed_at, refunded_at, \
    created_at, updated_at";

pub struct PurchaseRepo;

impl PurchaseRepo {
    /// Insert a pending purchase.
    pub async fn create(pool: &PgPool, input: &NewPurchase<'_>) -> Result<Purchase, sqlx::Error> {
        let query = format!(
            "INSERT INTO purchases \
                 (job_id, status_id, tier_id, variant_index, is_gift, \
                  purchaser_email, gift_recipient_email) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Purchase>(&query)
            .bind(input.job_id)
            .bind(PurchaseStatus::Pending.id())
            .bind(input.tier.id())
            .bind(input.variant_index)
            .bind(input.is_gift)
            .bind(input.purchaser_email)
            .bind(input.gift_recipient_email)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Purchase>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM purchases WHERE id = $1");
        sqlx::query_as::<_, Purchase>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Every purchase against a job, gifts included. Read fresh on every
    /// access check so a refund is visible immediately.
    pub async fn list_by_job(pool: &PgPool, job_id: DbId) -> Result<Vec<Purchase>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM purchases WHERE job_id = $1 ORDER BY created_at");
        sqlx::query_as::<_, Purchase>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Move a purchase to `to` only if it is currently in one of `from`.
    ///
    /// Returns `None` when the row is missing or in any other status; the
    /// caller decides whether that is a duplicate or a conflict.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: &[PurchaseStatus],
        to: PurchaseStatus,
    ) -> Result<Option<Purchase>, sqlx::Error> {
        let from_ids: Vec<StatusId> = from.iter().map(|s| s.id()).collect();
        let query = format!(
            "UPDATE purchases SET \
                 status_id = $3, \
                 completed_at = CASE WHEN $3 = $4 THEN NOW() ELSE completed_at END, \
                 refunded_at = CASE WHEN $3 = $5 THEN NOW() ELSE refunded_at END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = ANY($2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Purchase>(&query)
            .bind(id)
            .bind(&from_ids)
            .bind(to.id())
            .bind(PurchaseStatus::Completed.id())
            .bind(PurchaseStatus::Refunded.id())
            .fetch_optional(pool)
            .await
    }
}
