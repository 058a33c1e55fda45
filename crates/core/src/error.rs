use crate::types::DbId;

/// Domain error taxonomy shared across the workspace.
///
/// The API layer maps each variant onto an HTTP status; see
/// `atelier-api`'s `error` module.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An upstream provider call failed. Maps to 502 at the HTTP layer.
    #[error("Provider integration error: {0}")]
    Integration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
