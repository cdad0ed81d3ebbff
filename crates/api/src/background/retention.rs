//! Periodic deletion of expired jobs.
//!
//! Deleting a job cascades to its results, variant failures, purchases and
//! preference. Clients holding a credential for a swept job see
//! `SESSION_EXPIRED` on their next status check.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use sonogen_db::repositories::JobRepo;
use tokio_util::sync::CancellationToken;

/// Delete every job past its `expires_at`. Returns the number removed.
pub async fn sweep_once(pool: &PgPool) -> Result<u64, sqlx::Error> {
    JobRepo::delete_expired(pool, Utc::now()).await
}

/// Run the retention sweep loop until `cancel` is triggered.
pub async fn run(pool: PgPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Retention sweep started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Retention sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match sweep_once(&pool).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Retention sweep: deleted expired jobs");
                    }
                    Ok(_) => {
                        tracing::debug!("Retention sweep: nothing expired");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Retention sweep failed");
                    }
                }
            }
        }
    }
}
