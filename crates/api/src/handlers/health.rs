//! Liveness/readiness handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// GET /health
///
/// Liveness check including database connectivity. Always returns 200;
/// `db_healthy` tells monitoring whether the pool can reach Postgres.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = atelier_db::health_check(&state.pool).await.is_ok();

    Json(json!({
        "status": if db_healthy { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "db_healthy": db_healthy,
    }))
}
