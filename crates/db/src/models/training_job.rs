//! Training job entity: one personalization-model training per user.

use atelier_core::status::{StatusId, TrainingStatus};
use atelier_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `training_jobs` table.
///
/// At most one row exists per user (`uq_training_jobs_user_id`); "no
/// model" is the absence of a row. The provider model reference is
/// `model_owner/model_name`, with `model_version` filled in once the
/// training run succeeds.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrainingJob {
    pub id: DbId,
    pub user_id: DbId,
    pub status_id: StatusId,
    pub trigger_word: String,
    pub model_owner: String,
    pub model_name: String,
    pub model_version: Option<String>,
    pub external_training_id: Option<String>,
    pub weights_url: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TrainingJob {
    /// Typed view of `status_id`.
    ///
    /// Falls back to `Training` for an unmapped ID; the column references
    /// the seeded lookup table, so the fallback is unreachable in
    /// practice.
    pub fn status(&self) -> TrainingStatus {
        TrainingStatus::from_id(self.status_id).unwrap_or(TrainingStatus::Training)
    }

    /// The provider model reference (`owner/name`).
    pub fn model_ref(&self) -> String {
        format!("{}/{}", self.model_owner, self.model_name)
    }
}

/// Request body for `POST /api/v1/training/reset`.
#[derive(Debug, Default, Deserialize)]
pub struct ResetTrainingRequest {
    /// Also delete every photo the user has uploaded.
    #[serde(default)]
    pub delete_photos: bool,
}
