//! REST client for the Replicate-hosted training and prediction API.
//!
//! This crate is a contract-only boundary: it speaks the provider's wire
//! format and nothing else. All interpretation of statuses and outputs
//! happens in the callers (`atelier-core` parsing, `atelier-api`
//! reconciliation).

pub mod api;
pub mod types;

pub use api::{ReplicateApi, ReplicateApiError};
pub use types::{RemotePrediction, RemoteTraining, UploadedFile};
