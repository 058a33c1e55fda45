//! HTTP client for the provider REST endpoints.
//!
//! Wraps model management, file upload, training, and prediction calls
//! using [`reqwest`]. Every method either returns the parsed response or
//! a [`ReplicateApiError`] carrying the raw body for diagnostics --
//! provider schema drift is easiest to debug from the body the provider
//! actually sent.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{RemotePrediction, RemoteTraining, UploadedFile};

/// HTTP client for a single provider account.
pub struct ReplicateApi {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

/// Errors from the provider REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ReplicateApi {
    /// Create a new API client.
    ///
    /// * `base_url`  - API root, e.g. `https://api.replicate.com`.
    /// * `api_token` - account API token, sent as `Authorization: Token ...`.
    pub fn new(base_url: String, api_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_token,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, base_url: String, api_token: String) -> Self {
        Self {
            client,
            base_url,
            api_token,
        }
    }

    // -----------------------------------------------------------------------
    // Models
    // -----------------------------------------------------------------------

    /// Create a private model to serve as a training destination.
    pub async fn create_model(&self, owner: &str, name: &str) -> Result<(), ReplicateApiError> {
        let body = serde_json::json!({
            "owner": owner,
            "name": name,
            "visibility": "private",
        });

        let response = self
            .client
            .post(format!("{}/v1/models", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&body)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Delete a model and its versions.
    pub async fn delete_model(&self, owner: &str, name: &str) -> Result<(), ReplicateApiError> {
        let response = self
            .client
            .delete(format!("{}/v1/models/{owner}/{name}", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await?;

        Self::check_status(response).await
    }

    // -----------------------------------------------------------------------
    // Files
    // -----------------------------------------------------------------------

    /// Upload an asset bundle (the zipped training photos).
    ///
    /// Returns the stored file record whose `urls.get` the trainer can
    /// fetch.
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ReplicateApiError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/zip")?;
        let form = reqwest::multipart::Form::new().part("content", part);

        let response = self
            .client
            .post(format!("{}/v1/files", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // -----------------------------------------------------------------------
    // Trainings
    // -----------------------------------------------------------------------

    /// Start a training run against a destination model.
    ///
    /// `webhook` is the callback URL for completion deliveries; polling
    /// via [`get_training`](Self::get_training) works regardless.
    pub async fn create_training(
        &self,
        destination: &str,
        input: &Value,
        webhook: Option<&str>,
    ) -> Result<RemoteTraining, ReplicateApiError> {
        let mut body = serde_json::json!({
            "destination": destination,
            "input": input,
        });
        if let Some(url) = webhook {
            body["webhook"] = Value::String(url.to_string());
        }

        tracing::debug!(destination, webhook = webhook.is_some(), "Creating training run");

        let response = self
            .client
            .post(format!("{}/v1/trainings", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the current state of a training run (the poll fallback).
    pub async fn get_training(&self, id: &str) -> Result<RemoteTraining, ReplicateApiError> {
        let response = self
            .client
            .get(format!("{}/v1/trainings/{id}", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // -----------------------------------------------------------------------
    // Predictions
    // -----------------------------------------------------------------------

    /// Start one prediction (a single generation unit).
    pub async fn create_prediction(
        &self,
        version: &str,
        input: &Value,
        webhook: Option<&str>,
    ) -> Result<RemotePrediction, ReplicateApiError> {
        let mut body = serde_json::json!({
            "version": version,
            "input": input,
        });
        if let Some(url) = webhook {
            body["webhook"] = Value::String(url.to_string());
        }

        tracing::debug!(version, webhook = webhook.is_some(), "Creating prediction");

        let response = self
            .client
            .post(format!("{}/v1/predictions", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the current state of a prediction (the poll fallback).
    pub async fn get_prediction(&self, id: &str) -> Result<RemotePrediction, ReplicateApiError> {
        let response = self
            .client
            .get(format!("{}/v1/predictions/{id}", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // -----------------------------------------------------------------------
    // Response helpers
    // -----------------------------------------------------------------------

    /// Parse a JSON response body, or capture the raw body on a non-2xx
    /// status.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ReplicateApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplicateApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Check for a 2xx status, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ReplicateApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplicateApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
