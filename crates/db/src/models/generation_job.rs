//! Generation job (parent) entity and DTOs.

use atelier_core::status::{GenerationJobStatus, StatusId};
use atelier_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Default number of variants when the request does not specify one.
pub const DEFAULT_VARIANTS: i32 = 4;

/// Upper bound on variants per job.
pub const MAX_VARIANTS: i32 = 8;

/// A row from the `generation_jobs` table.
///
/// `status_id`, `progress_percent`, `phase`, `output_urls`, and
/// `failed_units` are always written together as one recomputation from
/// the full unit set -- see the reconciliation layer.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationJob {
    pub id: DbId,
    pub user_id: DbId,
    pub status_id: StatusId,
    pub prompt: String,
    pub progress_percent: i16,
    pub phase: Option<String>,
    /// JSONB array of output image URLs in unit-creation order.
    pub output_urls: serde_json::Value,
    pub failed_units: i32,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl GenerationJob {
    /// Typed view of `status_id`. The fallback is unreachable; the column
    /// references the seeded lookup table.
    pub fn status(&self) -> GenerationJobStatus {
        GenerationJobStatus::from_id(self.status_id).unwrap_or(GenerationJobStatus::Queued)
    }
}

/// Request body for `POST /api/v1/generations`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGenerationJob {
    #[validate(length(min = 1, max = 2000, message = "prompt must be 1-2000 characters"))]
    pub prompt: String,
    /// Number of variants to generate. Defaults to [`DEFAULT_VARIANTS`],
    /// capped at [`MAX_VARIANTS`].
    pub num_variants: Option<i32>,
}
