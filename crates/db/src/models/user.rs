//! Minimal user identity row.
//!
//! Account management (signup, login, sessions) lives in a separate
//! service; this row only anchors ownership of photos, trainings, and
//! generation jobs.

use atelier_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub display_name: String,
    pub created_at: Timestamp,
}
