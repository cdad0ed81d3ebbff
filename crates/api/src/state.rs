use std::sync::Arc;

use crate::config::ServerConfig;
use crate::signer::StorageSigner;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: sonogen_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Issues short-lived URLs for stored objects.
    pub signer: Arc<dyn StorageSigner>,
}
