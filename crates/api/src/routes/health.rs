use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub pipeline: PipelineInfo,
}

/// Generation settings this instance hands to the worker.
#[derive(Serialize)]
pub struct PipelineInfo {
    pub variant_count: i16,
    pub retention_days: i64,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match sonogen_db::health_check(&state.pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        pipeline: PipelineInfo {
            variant_count: state.config.variant_count,
            retention_days: state.config.retention_days,
        },
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
