//! Repository for the `training_photos` table.
//!
//! Photos are "uncommitted" while `training_job_id` is `NULL` and
//! "committed" once linked into a training run. Per-user duplicate
//! uploads are blocked by `uq_training_photos_user_hash`.

use sqlx::PgPool;

use atelier_core::types::DbId;

use crate::models::training_photo::TrainingPhoto;

/// Column list for `training_photos` queries.
const COLUMNS: &str = "\
    id, user_id, training_job_id, storage_key, normalized_key, \
    width, height, content_hash, content_type, size_bytes, created_at";

/// Provides CRUD and linking operations for training photos.
pub struct TrainingPhotoRepo;

impl TrainingPhotoRepo {
    /// Insert a new uncommitted photo.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        storage_key: &str,
        normalized_key: Option<&str>,
        width: i32,
        height: i32,
        content_hash: &str,
        content_type: &str,
        size_bytes: i64,
    ) -> Result<TrainingPhoto, sqlx::Error> {
        let query = format!(
            "INSERT INTO training_photos \
                 (user_id, storage_key, normalized_key, width, height, \
                  content_hash, content_type, size_bytes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrainingPhoto>(&query)
            .bind(user_id)
            .bind(storage_key)
            .bind(normalized_key)
            .bind(width)
            .bind(height)
            .bind(content_hash)
            .bind(content_type)
            .bind(size_bytes)
            .fetch_one(pool)
            .await
    }

    /// Find a photo by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TrainingPhoto>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM training_photos WHERE id = $1");
        sqlx::query_as::<_, TrainingPhoto>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Check whether the user already uploaded these exact bytes.
    pub async fn find_by_user_and_hash(
        pool: &PgPool,
        user_id: DbId,
        content_hash: &str,
    ) -> Result<Option<TrainingPhoto>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM training_photos WHERE user_id = $1 AND content_hash = $2"
        );
        sqlx::query_as::<_, TrainingPhoto>(&query)
            .bind(user_id)
            .bind(content_hash)
            .fetch_optional(pool)
            .await
    }

    /// List all of a user's photos, oldest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<TrainingPhoto>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM training_photos WHERE user_id = $1 ORDER BY id");
        sqlx::query_as::<_, TrainingPhoto>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// List the user's uncommitted photos, oldest first.
    pub async fn list_uncommitted(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<TrainingPhoto>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM training_photos \
             WHERE user_id = $1 AND training_job_id IS NULL ORDER BY id"
        );
        sqlx::query_as::<_, TrainingPhoto>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Total photo count for a user.
    pub async fn count_by_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM training_photos WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// Commit every uncommitted photo of the user into a training run.
    /// Returns the number of photos linked.
    pub async fn link_uncommitted(
        pool: &PgPool,
        user_id: DbId,
        training_job_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE training_photos SET training_job_id = $2 \
             WHERE user_id = $1 AND training_job_id IS NULL",
        )
        .bind(user_id)
        .bind(training_job_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Unlink every photo committed into a training run.
    pub async fn unlink_for_job(
        pool: &PgPool,
        training_job_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE training_photos SET training_job_id = NULL WHERE training_job_id = $1")
                .bind(training_job_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Delete one photo row.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM training_photos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all of a user's photos, returning their storage keys so the
    /// caller can clean up the object store best-effort.
    pub async fn delete_all_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        let keys: Vec<(String,)> =
            sqlx::query_as("DELETE FROM training_photos WHERE user_id = $1 RETURNING storage_key")
                .bind(user_id)
                .fetch_all(pool)
                .await?;
        Ok(keys.into_iter().map(|(key,)| key).collect())
    }
}
