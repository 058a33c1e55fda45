//! Repository for the `training_jobs` table.
//!
//! Terminal transitions are conditional updates guarded on the current
//! status, so replayed webhook deliveries and racing poll reconciliations
//! degrade to no-ops instead of moving a settled job backward. The
//! one-row-per-user invariant is `uq_training_jobs_user_id`.

use sqlx::PgPool;

use atelier_core::status::TrainingStatus;
use atelier_core::types::DbId;

use crate::models::training_job::TrainingJob;

/// Column list for `training_jobs` queries.
const COLUMNS: &str = "\
    id, user_id, status_id, trigger_word, model_owner, model_name, \
    model_version, external_training_id, weights_url, error_message, \
    started_at, completed_at, created_at, updated_at";

/// Provides lifecycle operations for training jobs.
pub struct TrainingJobRepo;

impl TrainingJobRepo {
    /// Insert a new job in `training` status.
    ///
    /// A second concurrent start for the same user fails here on
    /// `uq_training_jobs_user_id`, which the API layer reports as a
    /// conflict.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        trigger_word: &str,
        model_owner: &str,
        model_name: &str,
    ) -> Result<TrainingJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO training_jobs (user_id, status_id, trigger_word, model_owner, model_name) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrainingJob>(&query)
            .bind(user_id)
            .bind(TrainingStatus::Training.id())
            .bind(trigger_word)
            .bind(model_owner)
            .bind(model_name)
            .fetch_one(pool)
            .await
    }

    /// Find the user's job, if any.
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<TrainingJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM training_jobs WHERE user_id = $1");
        sqlx::query_as::<_, TrainingJob>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TrainingJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM training_jobs WHERE id = $1");
        sqlx::query_as::<_, TrainingJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve a job from the provider's training-run ID (webhook path).
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<TrainingJob>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM training_jobs WHERE external_training_id = $1");
        sqlx::query_as::<_, TrainingJob>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Record the provider's training-run ID after the remote run is
    /// created.
    pub async fn set_external_training_id(
        pool: &PgPool,
        id: DbId,
        external_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE training_jobs SET external_training_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(external_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Transition `training -> ready`, recording the resulting model
    /// version and weights URL.
    ///
    /// Guarded on the current status: returns `false` (and changes
    /// nothing) when the job is not in `training`, which makes replays
    /// and webhook/poll races no-ops.
    pub async fn mark_ready(
        pool: &PgPool,
        id: DbId,
        model_version: Option<&str>,
        weights_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE training_jobs \
             SET status_id = $2, model_version = $3, weights_url = $4, \
                 error_message = NULL, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(id)
        .bind(TrainingStatus::Ready.id())
        .bind(model_version)
        .bind(weights_url)
        .bind(TrainingStatus::Training.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition `training -> failed` or `training -> canceled` with an
    /// error message. Guarded like [`mark_ready`](Self::mark_ready).
    pub async fn mark_finished(
        pool: &PgPool,
        id: DbId,
        status: TrainingStatus,
        error_message: &str,
    ) -> Result<bool, sqlx::Error> {
        debug_assert!(matches!(
            status,
            TrainingStatus::Failed | TrainingStatus::Canceled
        ));

        let result = sqlx::query(
            "UPDATE training_jobs \
             SET status_id = $2, error_message = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(status.id())
        .bind(error_message)
        .bind(TrainingStatus::Training.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition `ready -> stale` after a dataset mutation.
    ///
    /// Guarded on `ready`, so repeated invalidations coalesce: the first
    /// one wins and the rest return `false`.
    pub async fn mark_stale(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE training_jobs SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(TrainingStatus::Stale.id())
        .bind(TrainingStatus::Ready.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a job row. Photos referencing it are unlinked by the
    /// `ON DELETE SET NULL` foreign key.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM training_jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
