//! Route definitions for the `/generations` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/generations`.
///
/// ```text
/// POST   /        -> create_generation_job
/// GET    /{id}    -> get_generation_job
/// DELETE /{id}    -> delete_generation_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generation::create_generation_job))
        .route(
            "/{id}",
            get(generation::get_generation_job).delete(generation::delete_generation_job),
        )
}
