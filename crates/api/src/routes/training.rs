//! Route definitions for the `/training` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::training;
use crate::state::AppState;

/// Routes mounted at `/training`.
///
/// ```text
/// POST /start   -> start_training
/// GET  /status  -> training_status
/// POST /reset   -> reset_training
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(training::start_training))
        .route("/status", get(training::training_status))
        .route("/reset", post(training::reset_training))
}
