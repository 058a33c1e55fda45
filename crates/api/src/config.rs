//! Server configuration loaded from environment variables.
//!
//! All fields have defaults suitable for local development except the
//! secrets (JWT secret, provider token), which must be set explicitly.
//! Malformed values fail fast at startup.

use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Deployment environment. Controls how strictly the webhook endpoint
/// behaves when no authentication is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse from `APP_ENV`; anything other than `production` is
    /// development.
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV").as_deref() {
            Ok("production") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Provider account configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API root, e.g. `https://api.replicate.com`.
    pub base_url: String,
    /// Account API token.
    pub api_token: String,
    /// Account that owns the per-user destination models.
    pub model_owner: String,
    /// Externally reachable base URL of this service, used to build the
    /// webhook callback URL. When unset, the provider is not asked to
    /// deliver webhooks and state converges through polling alone.
    pub public_base_url: Option<String>,
}

/// Inbound webhook authentication configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// HMAC secret for signature verification (preferred).
    pub hmac_secret: Option<String>,
    /// Shared-secret header fallback.
    pub shared_token: Option<String>,
    /// Timestamp tolerance window in seconds.
    pub tolerance_secs: i64,
}

/// Training thresholds.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Minimum uncommitted photos required to start a training run.
    pub min_photos: i64,
    /// Maximum photos a user may keep uploaded.
    pub max_photos: i64,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Deployment environment.
    pub environment: Environment,
    /// Root directory for the local storage backend.
    pub storage_root: PathBuf,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Provider account configuration.
    pub provider: ProviderConfig,
    /// Webhook authentication configuration.
    pub webhook: WebhookConfig,
    /// Training thresholds.
    pub training: TrainingConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Required | Default                    |
    /// |--------------------------|----------|----------------------------|
    /// | `HOST`                   | no       | `0.0.0.0`                  |
    /// | `PORT`                   | no       | `3000`                     |
    /// | `CORS_ORIGINS`           | no       | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`   | no       | `30`                       |
    /// | `APP_ENV`                | no       | `development`              |
    /// | `STORAGE_ROOT`           | no       | `./data/storage`           |
    /// | `JWT_SECRET`             | **yes**  | --                         |
    /// | `PROVIDER_BASE_URL`      | no       | `https://api.replicate.com`|
    /// | `PROVIDER_API_TOKEN`     | **yes**  | --                         |
    /// | `PROVIDER_MODEL_OWNER`   | **yes**  | --                         |
    /// | `PUBLIC_BASE_URL`        | no       | unset (poll-only)          |
    /// | `WEBHOOK_HMAC_SECRET`    | no       | unset                      |
    /// | `WEBHOOK_SHARED_TOKEN`   | no       | unset                      |
    /// | `WEBHOOK_TOLERANCE_SECS` | no       | `300`                      |
    /// | `TRAINING_MIN_PHOTOS`    | no       | `5`                        |
    /// | `TRAINING_MAX_PHOTOS`    | no       | `20`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let environment = Environment::from_env();

        let storage_root =
            PathBuf::from(std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data/storage".into()));

        let provider = ProviderConfig {
            base_url: std::env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| "https://api.replicate.com".into()),
            api_token: std::env::var("PROVIDER_API_TOKEN")
                .expect("PROVIDER_API_TOKEN must be set in the environment"),
            model_owner: std::env::var("PROVIDER_MODEL_OWNER")
                .expect("PROVIDER_MODEL_OWNER must be set in the environment"),
            public_base_url: std::env::var("PUBLIC_BASE_URL").ok(),
        };

        let webhook = WebhookConfig {
            hmac_secret: std::env::var("WEBHOOK_HMAC_SECRET").ok(),
            shared_token: std::env::var("WEBHOOK_SHARED_TOKEN").ok(),
            tolerance_secs: std::env::var("WEBHOOK_TOLERANCE_SECS")
                .unwrap_or_else(|_| atelier_core::signing::DEFAULT_TOLERANCE_SECS.to_string())
                .parse()
                .expect("WEBHOOK_TOLERANCE_SECS must be a valid i64"),
        };

        let training = TrainingConfig {
            min_photos: std::env::var("TRAINING_MIN_PHOTOS")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .expect("TRAINING_MIN_PHOTOS must be a valid i64"),
            max_photos: std::env::var("TRAINING_MAX_PHOTOS")
                .unwrap_or_else(|_| "20".into())
                .parse()
                .expect("TRAINING_MAX_PHOTOS must be a valid i64"),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            environment,
            storage_root,
            jwt: JwtConfig::from_env(),
            provider,
            webhook,
            training,
        }
    }

    /// Callback URL handed to the provider for webhook deliveries, when
    /// this deployment is externally reachable.
    pub fn webhook_callback_url(&self) -> Option<String> {
        self.provider
            .public_base_url
            .as_ref()
            .map(|base| format!("{}/api/v1/webhooks/replicate", base.trim_end_matches('/')))
    }
}
