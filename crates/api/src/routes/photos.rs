//! Route definitions for the `/photos` resource.
//!
//! All endpoints require authentication.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get};
use axum::Router;

use atelier_core::photos::MAX_PHOTO_BYTES;

use crate::handlers::photos;
use crate::state::AppState;

/// Routes mounted at `/photos`.
///
/// ```text
/// GET    /        -> list_photos
/// POST   /        -> upload_photo
/// DELETE /{id}    -> delete_photo
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(photos::list_photos).post(photos::upload_photo))
        .route("/{id}", delete(photos::delete_photo))
        // Axum's default body cap is below the photo limit; leave
        // headroom for the multipart framing.
        .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + 64 * 1024))
}
