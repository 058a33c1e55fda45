//! Route definitions for the `/webhooks` resource.
//!
//! Authenticated by signature or shared secret, not by user token -- the
//! caller is the provider, not a user.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/webhooks`.
///
/// ```text
/// POST /replicate -> provider_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/replicate", post(webhooks::provider_webhook))
}
