//! Route tree construction.

pub mod generation;
pub mod health;
pub mod photos;
pub mod training;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /photos                       GET list, POST upload (auth)
/// /photos/{id}                  DELETE (auth)
///
/// /training/start               POST start training (auth)
/// /training/status              GET lazy-reconciled status (auth)
/// /training/reset               POST reset (auth)
///
/// /generations                  POST create job (auth)
/// /generations/{id}             GET lazy-reconciled status, DELETE (auth)
///
/// /webhooks/replicate           POST provider deliveries (signature)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/photos", photos::router())
        .nest("/training", training::router())
        .nest("/generations", generation::router())
        .nest("/webhooks", webhooks::router())
}
