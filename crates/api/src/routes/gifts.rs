use axum::routing::post;
use axum::Router;

use crate::handlers::purchases;
use crate::state::AppState;

/// Routes mounted at `/gifts`. Public: no session credential.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(purchases::create_gift))
}
