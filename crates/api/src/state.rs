use std::sync::Arc;

use atelier_replicate::ReplicateApi;
use atelier_storage::StorageProvider;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: atelier_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Provider REST client.
    pub replicate: Arc<ReplicateApi>,
    /// Object storage backend for photos.
    pub storage: Arc<dyn StorageProvider>,
}
