//! Insert-only idempotency ledger for webhook deliveries.

use sqlx::PgPool;

/// Provides the single ledger operation.
///
/// The ledger is append-only and durable on purpose: idempotency
/// memoization must survive process restarts and multiple instances, so
/// it cannot live in a process-local cache.
pub struct WebhookEventRepo;

impl WebhookEventRepo {
    /// Record a delivery exactly once.
    ///
    /// Returns `true` when this call inserted the key (first delivery)
    /// and `false` when the key already existed (duplicate). The
    /// uniqueness violation is absorbed by `ON CONFLICT DO NOTHING`
    /// rather than surfaced as an error: a duplicate is an expected
    /// outcome, not a failure.
    pub async fn record_once(pool: &PgPool, event_key: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO webhook_events (event_key) VALUES ($1) \
             ON CONFLICT (event_key) DO NOTHING",
        )
        .bind(event_key)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
