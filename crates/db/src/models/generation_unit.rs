//! Generation unit entity: one provider prediction within a job.

use atelier_core::status::{GenerationUnitStatus, StatusId};
use atelier_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `generation_units` table.
///
/// `external_prediction_id` is unique, which lets a webhook delivery
/// resolve its unit without knowing the parent job, and is `NULL` only
/// until dispatch (or forever, when dispatch itself failed).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationUnit {
    pub id: DbId,
    pub job_id: DbId,
    pub external_prediction_id: Option<String>,
    pub status_id: StatusId,
    /// JSONB array of this unit's output image URLs.
    pub output_urls: serde_json::Value,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GenerationUnit {
    /// Typed view of `status_id`. The fallback is unreachable; the column
    /// references the seeded lookup table.
    pub fn status(&self) -> GenerationUnitStatus {
        GenerationUnitStatus::from_id(self.status_id).unwrap_or(GenerationUnitStatus::Queued)
    }

    /// This unit's output URLs as strings, skipping non-string entries.
    pub fn outputs(&self) -> Vec<String> {
        self.output_urls
            .as_array()
            .map(|urls| {
                urls.iter()
                    .filter_map(|u| u.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }
}
