pub mod callbacks;
pub mod gifts;
pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                                                  upload (POST)
/// /jobs/{id}                                             delete (DELETE)
/// /jobs/{id}/status                                      status snapshot (GET)
/// /jobs/{id}/results                                     variant listing (GET)
/// /jobs/{id}/results/{variant_index}/download            signed HD URL (GET)
/// /jobs/{id}/purchases                                   owner purchase (POST)
/// /jobs/{id}/preference                                  favored variant (POST)
///
/// /gifts                                                 gift purchase (POST)
///
/// /callbacks/jobs/{id}/stage                             worker: stage reached
/// /callbacks/jobs/{id}/variants/{variant_index}/completed
/// /callbacks/jobs/{id}/variants/{variant_index}/failed
/// /callbacks/jobs/{id}/failure                           worker: job failed
/// /callbacks/purchases/{id}/completed                    payment provider
/// /callbacks/purchases/{id}/refunded
/// /callbacks/purchases/{id}/failed
/// ```
///
/// Job routes require the `x-session-token` header; callback routes require
/// an `x-signature` HMAC of the body.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/gifts", gifts::router())
        .nest("/callbacks", callbacks::router())
}
