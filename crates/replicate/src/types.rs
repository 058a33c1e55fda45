//! Wire types for the provider REST API.
//!
//! Only the fields this system consumes are modeled; everything else in
//! the provider's (large) response bodies is ignored by serde.

use serde::Deserialize;

/// A training run as reported by `POST /v1/trainings` and
/// `GET /v1/trainings/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteTraining {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A prediction as reported by `POST /v1/predictions` and
/// `GET /v1/predictions/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePrediction {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from the file upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub urls: FileUrls,
}

/// Serving URLs for an uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileUrls {
    /// URL the provider's trainers can fetch the file from.
    pub get: String,
}
