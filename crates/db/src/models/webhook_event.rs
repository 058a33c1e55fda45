//! Webhook delivery ledger entity.

use atelier_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the insert-only `webhook_events` ledger.
///
/// Rows are never updated or deleted; a failed insert on
/// `uq_webhook_events_event_key` is the authoritative signal that this
/// exact delivery was already processed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookEvent {
    pub id: DbId,
    pub event_key: String,
    pub received_at: Timestamp,
}

impl WebhookEvent {
    /// Build the ledger key for a delivery.
    ///
    /// Distinct statuses for the same external ID are distinct keys, so
    /// e.g. a training's `processing` and `succeeded` deliveries are
    /// never conflated.
    pub fn event_key(external_id: &str, status: &str) -> String {
        format!("replicate:{external_id}:{status}")
    }
}
