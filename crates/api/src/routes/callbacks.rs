//! Route definitions for inbound worker and payment callbacks.

use axum::routing::post;
use axum::Router;

use crate::handlers::{callbacks, purchases};
use crate::state::AppState;

/// Routes mounted at `/callbacks`.
///
/// ```text
/// POST /jobs/{id}/stage                                 -> stage_reached
/// POST /jobs/{id}/variants/{variant_index}/completed    -> variant_completed
/// POST /jobs/{id}/variants/{variant_index}/failed       -> variant_failed
/// POST /jobs/{id}/failure                               -> job_failed
/// POST /purchases/{id}/completed                        -> purchase_completed
/// POST /purchases/{id}/refunded                         -> purchase_refunded
/// POST /purchases/{id}/failed                           -> purchase_failed
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs/{id}/stage", post(callbacks::stage_reached))
        .route(
            "/jobs/{id}/variants/{variant_index}/completed",
            post(callbacks::variant_completed),
        )
        .route(
            "/jobs/{id}/variants/{variant_index}/failed",
            post(callbacks::variant_failed),
        )
        .route("/jobs/{id}/failure", post(callbacks::job_failed))
        .route("/purchases/{id}/completed", post(purchases::purchase_completed))
        .route("/purchases/{id}/refunded", post(purchases::purchase_refunded))
        .route("/purchases/{id}/failed", post(purchases::purchase_failed))
}
