//! Training photo entity.

use atelier_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `training_photos` table.
///
/// `training_job_id` is set while the photo is committed into a training
/// run and `NULL` otherwise; a photo is linked to at most one job at a
/// time. `content_hash` backs the per-user duplicate check.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrainingPhoto {
    pub id: DbId,
    pub user_id: DbId,
    pub training_job_id: Option<DbId>,
    pub storage_key: String,
    pub normalized_key: Option<String>,
    pub width: i32,
    pub height: i32,
    pub content_hash: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: Timestamp,
}

/// Compact photo view embedded in training status responses.
#[derive(Debug, Serialize)]
pub struct PhotoSummary {
    pub id: DbId,
    pub storage_key: String,
    pub width: i32,
    pub height: i32,
    pub committed: bool,
}

impl From<&TrainingPhoto> for PhotoSummary {
    fn from(photo: &TrainingPhoto) -> Self {
        Self {
            id: photo.id,
            storage_key: photo.storage_key.clone(),
            width: photo.width,
            height: photo.height,
            committed: photo.training_job_id.is_some(),
        }
    }
}
