#![allow(dead_code)]

//! Shared helpers for API integration tests.
//!
//! Builds the same router/middleware stack as production against a
//! per-test database (via `#[sqlx::test]`), a throwaway local storage
//! root, and a provider base URL pointing at an unreachable port so any
//! provider call fails fast -- which is exactly what the poll-failure
//! and best-effort code paths are specified against.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use sqlx::PgPool;
use tower::ServiceExt;

use atelier_api::auth::jwt::{generate_access_token, JwtConfig};
use atelier_api::config::{
    Environment, ProviderConfig, ServerConfig, TrainingConfig, WebhookConfig,
};
use atelier_api::router::build_app_router;
use atelier_api::state::AppState;
use atelier_core::photos::content_fingerprint;
use atelier_core::signing;
use atelier_core::types::DbId;
use atelier_db::models::training_photo::TrainingPhoto;
use atelier_db::repositories::{TrainingPhotoRepo, UserRepo};
use atelier_replicate::ReplicateApi;
use atelier_storage::{LocalStorage, StorageProvider};

/// JWT secret shared by test tokens and the test config.
pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Webhook HMAC secret configured in tests.
pub const TEST_WEBHOOK_SECRET: &str = "integration-test-webhook-secret";

/// Build a test `ServerConfig`.
///
/// The provider base URL targets the discard port on localhost, so every
/// provider call fails immediately with a connection error.
pub fn test_config(storage_root: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        environment: Environment::Development,
        storage_root,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
        provider: ProviderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_token: "test-token".to_string(),
            model_owner: "atelier-test".to_string(),
            public_base_url: None,
        },
        webhook: WebhookConfig {
            hmac_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
            shared_token: None,
            tolerance_secs: signing::DEFAULT_TOLERANCE_SECS,
        },
        training: TrainingConfig {
            min_photos: 5,
            max_photos: 20,
        },
    }
}

/// Build the application state against a throwaway storage root.
pub fn test_state(pool: PgPool) -> AppState {
    let storage_root =
        std::env::temp_dir().join(format!("atelier-api-test-{}", uuid::Uuid::new_v4()));
    let config = test_config(storage_root.clone());

    AppState {
        pool,
        replicate: Arc::new(ReplicateApi::new(
            config.provider.base_url.clone(),
            config.provider.api_token.clone(),
        )),
        storage: Arc::new(LocalStorage::new(storage_root)),
        config: Arc::new(config),
    }
}

/// Build the full application router from a test state, mirroring the
/// production middleware stack.
pub fn build_test_app(state: &AppState) -> Router {
    build_app_router(state.clone(), &state.config)
}

/// Create a user row and a bearer token for it.
pub async fn seed_user(pool: &PgPool, email: &str) -> (DbId, String) {
    let user = UserRepo::create(pool, email, "Test User").await.unwrap();
    let token = generate_access_token(
        user.id,
        &JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
    )
    .unwrap();
    (user.id, token)
}

/// Seed one photo row with matching bytes in storage.
///
/// The bytes are synthetic (not a decodable image); they only need to
/// exist for bundle packaging and fingerprinting.
pub async fn seed_photo(state: &AppState, user_id: DbId, n: u32) -> TrainingPhoto {
    let bytes = format!("synthetic-photo-bytes-{user_id}-{n}").into_bytes();
    let key = format!("users/{user_id}/photos/seed-{n}.jpg");
    state.storage.put(&key, &bytes).await.unwrap();

    TrainingPhotoRepo::create(
        &state.pool,
        user_id,
        &key,
        Some(&key),
        512,
        512,
        &content_fingerprint(&bytes),
        "image/jpeg",
        bytes.len() as i64,
    )
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a GET request without authentication.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send an authenticated GET request.
pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send an authenticated POST request with a JSON body.
pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send an authenticated DELETE request.
pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a webhook delivery with the given extra headers.
pub async fn post_webhook(
    app: Router,
    body: String,
    headers: &[(&str, String)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/replicate")
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    let request = builder.body(Body::from(body)).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Signature headers for a webhook body, signed with the test secret at
/// the given timestamp.
pub fn signed_headers(body: &str, timestamp: i64) -> Vec<(&'static str, String)> {
    vec![
        ("x-webhook-timestamp", timestamp.to_string()),
        (
            "x-webhook-signature",
            signing::sign_payload(timestamp, body, TEST_WEBHOOK_SECRET),
        ),
    ]
}

/// Signature headers stamped with the current time.
pub fn signed_headers_now(body: &str) -> Vec<(&'static str, String)> {
    signed_headers(body, chrono::Utc::now().timestamp())
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

/// Assert a response status and return the parsed body.
pub async fn expect_status(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    let got = response.status();
    let body = body_json(response).await;
    assert_eq!(got, status, "unexpected status; body: {body}");
    body
}
