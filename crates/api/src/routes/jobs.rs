//! Route definitions for the `/jobs` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{jobs, preferences, purchases, results};
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST   /                                        -> create_job
/// DELETE /{id}                                    -> delete_job
/// GET    /{id}/status                             -> get_status
/// GET    /{id}/results                            -> list_results
/// GET    /{id}/results/{variant_index}/download   -> download_result
/// POST   /{id}/purchases                          -> create_purchase
/// POST   /{id}/preference                         -> record_preference
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::create_job))
        .route("/{id}", delete(jobs::delete_job))
        .route("/{id}/status", get(jobs::get_status))
        .route("/{id}/results", get(results::list_results))
        .route(
            "/{id}/results/{variant_index}/download",
            get(results::download_result),
        )
        .route("/{id}/purchases", post(purchases::create_purchase))
        .route("/{id}/preference", post(preferences::record_preference))
}
