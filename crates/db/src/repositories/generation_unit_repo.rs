//! Repository for the `generation_units` table.
//!
//! Unit updates are guarded so a terminal unit is never overwritten:
//! whichever of the webhook or poll paths lands a terminal status first
//! wins, and the other becomes a no-op.

use sqlx::PgPool;

use atelier_core::status::GenerationUnitStatus;
use atelier_core::types::DbId;

use crate::models::generation_unit::GenerationUnit;

/// Column list for `generation_units` queries.
const COLUMNS: &str = "\
    id, job_id, external_prediction_id, status_id, output_urls, \
    error_message, created_at, updated_at";

/// Terminal unit statuses, used to guard updates.
const TERMINAL_STATUSES: [GenerationUnitStatus; 3] = [
    GenerationUnitStatus::Succeeded,
    GenerationUnitStatus::Failed,
    GenerationUnitStatus::Canceled,
];

/// Provides operations for individual generation units.
pub struct GenerationUnitRepo;

impl GenerationUnitRepo {
    /// List a job's units in creation order. Output concatenation and
    /// aggregation both rely on this ordering.
    pub async fn list_by_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<GenerationUnit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_units WHERE job_id = $1 ORDER BY id");
        sqlx::query_as::<_, GenerationUnit>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Resolve a unit from the provider's prediction ID (webhook path).
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<GenerationUnit>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM generation_units WHERE external_prediction_id = $1");
        sqlx::query_as::<_, GenerationUnit>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Record the provider's prediction ID after dispatch.
    pub async fn set_external_id(
        pool: &PgPool,
        id: DbId,
        external_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_units \
             SET external_prediction_id = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(external_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a unit failed because its provider dispatch never succeeded.
    /// The unit has no external ID, so no webhook will ever arrive for it.
    pub async fn mark_dispatch_failed(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_units \
             SET status_id = $2, error_message = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(GenerationUnitStatus::Failed.id())
        .bind(error_message)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Apply a provider-reported update to one unit.
    ///
    /// Guarded against terminal statuses: returns `false` (nothing
    /// written) when the unit is already settled. `output_urls` and
    /// `error_message` are only overwritten when provided.
    pub async fn apply_update(
        pool: &PgPool,
        id: DbId,
        status: GenerationUnitStatus,
        output_urls: Option<&serde_json::Value>,
        error_message: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_units \
             SET status_id = $2, \
                 output_urls = COALESCE($3, output_urls), \
                 error_message = COALESCE($4, error_message), \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($5, $6, $7)",
        )
        .bind(id)
        .bind(status.id())
        .bind(output_urls)
        .bind(error_message)
        .bind(TERMINAL_STATUSES[0].id())
        .bind(TERMINAL_STATUSES[1].id())
        .bind(TERMINAL_STATUSES[2].id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
