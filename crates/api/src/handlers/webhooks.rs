//! Inbound provider webhook handler.
//!
//! The provider delivers `{id, status, output?, error?}` for trainings
//! and predictions alike; deliveries may be delayed, duplicated, or
//! lost. This handler authenticates the delivery, records it in the
//! idempotency ledger, resolves the matching training job or generation
//! unit by external ID, and applies the shared transition functions from
//! the reconciliation module.
//!
//! Anything already processed -- and anything that no longer resolves to
//! a row, e.g. a delivery for a deleted job -- returns success so the
//! provider stops retrying.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use atelier_core::error::CoreError;
use atelier_core::signing;
use atelier_core::status::GenerationUnitStatus;
use atelier_core::training;
use atelier_db::models::webhook_event::WebhookEvent;
use atelier_db::repositories::{GenerationUnitRepo, TrainingJobRepo, WebhookEventRepo};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::reconcile;
use crate::state::AppState;

/// Timestamp header accompanying an HMAC-signed delivery.
const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";
/// Signature header (`v1,<base64 hmac>`).
const SIGNATURE_HEADER: &str = "x-webhook-signature";
/// Shared-secret header for deployments without HMAC configured.
const TOKEN_HEADER: &str = "x-webhook-token";

/// Delivery body sent by the provider.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    /// External ID of the training run or prediction.
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// POST /api/v1/webhooks/replicate
///
/// Ingest one provider delivery. The raw body is needed for signature
/// verification, so JSON parsing happens after authentication.
pub async fn provider_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    authorize_delivery(&state.config, &headers, &body)?;

    let payload: WebhookPayload = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;

    // Dedupe before any state mutation. The ledger key includes the
    // status, so distinct transitions of one external ID each get their
    // own processing pass.
    let event_key = WebhookEvent::event_key(&payload.id, &payload.status);
    if !WebhookEventRepo::record_once(&state.pool, &event_key).await? {
        tracing::debug!(event_key = %event_key, "Duplicate webhook delivery ignored");
        return Ok(Json(json!({ "received": true, "duplicate": true })));
    }

    // Training run?
    if let Some(job) = TrainingJobRepo::find_by_external_id(&state.pool, &payload.id).await? {
        let outcome = training::parse_outcome(
            &payload.status,
            payload.output.as_ref(),
            payload.error.as_deref(),
        );
        reconcile::apply_training_outcome(&state.pool, &job, &outcome).await?;
        return Ok(Json(json!({ "received": true })));
    }

    // Generation unit?
    if let Some(unit) = GenerationUnitRepo::find_by_external_id(&state.pool, &payload.id).await? {
        match GenerationUnitStatus::from_provider(&payload.status) {
            Some(status) => {
                reconcile::apply_unit_update(
                    &state.pool,
                    &unit,
                    status,
                    payload.output.as_ref(),
                    payload.error.as_deref(),
                )
                .await?;
            }
            None => {
                tracing::debug!(
                    unit_id = unit.id,
                    status = %payload.status,
                    "Untracked provider status ignored",
                );
            }
        }
        return Ok(Json(json!({ "received": true })));
    }

    // Nothing matched: most likely a delivery for a job the user already
    // deleted. Acknowledge so the provider stops retrying.
    tracing::debug!(
        external_id = %payload.id,
        status = %payload.status,
        "Webhook for unknown external id ignored",
    );
    Ok(Json(json!({ "received": true })))
}

/// Authenticate a delivery.
///
/// Preference order: HMAC signature over `{timestamp}.{body}` within the
/// tolerance window, then the shared-secret header. When neither is
/// configured the endpoint fails closed in production and is permissive
/// (with a warning) everywhere else.
fn authorize_delivery(
    config: &ServerConfig,
    headers: &HeaderMap,
    body: &str,
) -> Result<(), AppError> {
    if let Some(secret) = &config.webhook.hmac_secret {
        let timestamp: i64 = header_str(headers, TIMESTAMP_HEADER)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| unauthorized("Missing or malformed webhook timestamp"))?;

        if !signing::within_tolerance(
            timestamp,
            chrono::Utc::now().timestamp(),
            config.webhook.tolerance_secs,
        ) {
            return Err(unauthorized("Webhook timestamp outside tolerance window"));
        }

        let signature = header_str(headers, SIGNATURE_HEADER)
            .ok_or_else(|| unauthorized("Missing webhook signature"))?;

        if !signing::verify_signature(timestamp, body, signature, secret) {
            return Err(unauthorized("Invalid webhook signature"));
        }

        return Ok(());
    }

    if let Some(token) = &config.webhook.shared_token {
        let presented =
            header_str(headers, TOKEN_HEADER).ok_or_else(|| unauthorized("Missing webhook token"))?;
        if presented != token {
            return Err(unauthorized("Invalid webhook token"));
        }
        return Ok(());
    }

    if config.environment.is_production() {
        tracing::error!("Webhook received but no webhook authentication is configured");
        return Err(unauthorized("Webhook authentication is not configured"));
    }

    tracing::warn!("Accepting unauthenticated webhook outside production");
    Ok(())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}
