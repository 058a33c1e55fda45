//! Repository for the `generation_jobs` table.
//!
//! The parent row's status block (status, progress, phase, outputs,
//! failed-unit count) is only ever written through
//! [`GenerationJobRepo::apply_aggregate`], and only while the job is
//! still non-terminal, so a settled job cannot drift or regress.

use sqlx::PgPool;

use atelier_core::status::{GenerationJobStatus, GenerationUnitStatus};
use atelier_core::types::DbId;

use crate::models::generation_job::GenerationJob;
use crate::models::generation_unit::GenerationUnit;

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "\
    id, user_id, status_id, prompt, progress_percent, phase, output_urls, \
    failed_units, error_message, created_at, updated_at, completed_at";

/// Column list for `generation_units` rows returned from the creation
/// transaction.
const UNIT_COLUMNS: &str = "\
    id, job_id, external_prediction_id, status_id, output_urls, \
    error_message, created_at, updated_at";

/// Terminal parent statuses, used to guard recomputation writes.
const TERMINAL_STATUSES: [GenerationJobStatus; 4] = [
    GenerationJobStatus::Succeeded,
    GenerationJobStatus::SucceededPartial,
    GenerationJobStatus::Failed,
    GenerationJobStatus::Canceled,
];

/// Provides operations for generation jobs and their creation fan-out.
pub struct GenerationJobRepo;

impl GenerationJobRepo {
    /// Create a job plus `unit_count` queued units in one transaction.
    pub async fn create_with_units(
        pool: &PgPool,
        user_id: DbId,
        prompt: &str,
        unit_count: i32,
    ) -> Result<(GenerationJob, Vec<GenerationUnit>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let job_query = format!(
            "INSERT INTO generation_jobs (user_id, status_id, prompt) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, GenerationJob>(&job_query)
            .bind(user_id)
            .bind(GenerationJobStatus::Queued.id())
            .bind(prompt)
            .fetch_one(&mut *tx)
            .await?;

        let unit_query = format!(
            "INSERT INTO generation_units (job_id, status_id) \
             SELECT $1, $2 FROM generate_series(1, $3) \
             RETURNING {UNIT_COLUMNS}"
        );
        let units = sqlx::query_as::<_, GenerationUnit>(&unit_query)
            .bind(job.id)
            .bind(GenerationUnitStatus::Queued.id())
            .bind(unit_count)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((job, units))
    }

    /// Find a job by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Write a freshly recomputed status block.
    ///
    /// No-ops when the job already reached a terminal status: since the
    /// aggregate is a pure function of the unit set and units themselves
    /// never regress, any later recomputation of a settled job would
    /// write identical values anyway.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_aggregate(
        pool: &PgPool,
        id: DbId,
        status: GenerationJobStatus,
        progress_percent: i16,
        phase: &str,
        output_urls: &serde_json::Value,
        failed_units: i32,
        error_message: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs \
             SET status_id = $2, progress_percent = $3, phase = $4, \
                 output_urls = $5, failed_units = $6, error_message = $7, \
                 completed_at = CASE WHEN $2 IN ($8, $9, $10, $11) THEN NOW() ELSE NULL END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($8, $9, $10, $11)",
        )
        .bind(id)
        .bind(status.id())
        .bind(progress_percent)
        .bind(phase)
        .bind(output_urls)
        .bind(failed_units)
        .bind(error_message)
        .bind(TERMINAL_STATUSES[0].id())
        .bind(TERMINAL_STATUSES[1].id())
        .bind(TERMINAL_STATUSES[2].id())
        .bind(TERMINAL_STATUSES[3].id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a job; its units cascade via the foreign key.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generation_jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
