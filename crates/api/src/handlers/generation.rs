//! Handlers for the `/generations` resource.
//!
//! Creation persists the job and its units first, then dispatches the
//! provider predictions with bounded concurrency and returns the job id
//! immediately -- callers poll for completion. Freshness on reads is
//! pulled lazily: a status read of a non-terminal job reconciles against
//! the provider before responding. There is no background worker.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{self, StreamExt};
use serde_json::json;
use validator::Validate;

use atelier_core::error::CoreError;
use atelier_core::status::TrainingStatus;
use atelier_core::types::DbId;
use atelier_db::models::generation_job::{
    CreateGenerationJob, GenerationJob, DEFAULT_VARIANTS, MAX_VARIANTS,
};
use atelier_db::repositories::{
    GenerationJobRepo, GenerationUnitRepo, TrainingJobRepo,
};
use atelier_storage::StorageProvider;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::reconcile;
use crate::state::AppState;

/// Concurrent provider dispatches per job creation.
const DISPATCH_CONCURRENCY: usize = 2;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job by ID and verify the caller owns it.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    job_id: DbId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<GenerationJob> {
    let job = GenerationJobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GenerationJob",
            id: job_id,
        }))?;

    if job.user_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's generation job"
        ))));
    }

    Ok(job)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/generations
///
/// Create a generation job with N variant units and dispatch them to the
/// provider. Returns `{jobId}` immediately; per-unit dispatch failures
/// become failed units rather than aborting the whole batch.
pub async fn create_generation_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGenerationJob>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let variants = input.num_variants.unwrap_or(DEFAULT_VARIANTS);
    if !(1..=MAX_VARIANTS).contains(&variants) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "num_variants must be between 1 and {MAX_VARIANTS}"
        ))));
    }

    // Generation needs trained weights. A stale model is still usable:
    // its weights exist until a reset or retrain replaces them.
    let training = TrainingJobRepo::find_by_user(&state.pool, auth.user_id)
        .await?
        .filter(|job| {
            matches!(job.status(), TrainingStatus::Ready | TrainingStatus::Stale)
        })
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "No trained model available. Train a model before generating".into(),
            ))
        })?;

    let Some(version) = training.model_version.clone() else {
        return Err(AppError::Core(CoreError::Internal(
            "Trained model is missing its version reference".into(),
        )));
    };

    let (job, units) =
        GenerationJobRepo::create_with_units(&state.pool, auth.user_id, &input.prompt, variants)
            .await?;

    // The stored prompt is the user's; the provider prompt embeds the
    // trigger word so the trained weights activate.
    let provider_input = json!({
        "prompt": format!("{} {}", training.trigger_word, input.prompt),
        "num_outputs": 1,
    });
    let webhook = state.config.webhook_callback_url();

    let dispatches: Vec<(DbId, Result<atelier_replicate::RemotePrediction, _>)> =
        stream::iter(units.iter().map(|u| u.id).collect::<Vec<_>>())
            .map(|unit_id| {
                let api = Arc::clone(&state.replicate);
                let version = version.clone();
                let provider_input = provider_input.clone();
                let webhook = webhook.clone();
                async move {
                    let result = api
                        .create_prediction(&version, &provider_input, webhook.as_deref())
                        .await;
                    (unit_id, result)
                }
            })
            .buffer_unordered(DISPATCH_CONCURRENCY)
            .collect()
            .await;

    let mut dispatch_failures = 0;
    for (unit_id, result) in dispatches {
        match result {
            Ok(prediction) => {
                GenerationUnitRepo::set_external_id(&state.pool, unit_id, &prediction.id).await?;
            }
            Err(e) => {
                dispatch_failures += 1;
                tracing::warn!(
                    unit_id,
                    job_id = job.id,
                    error = %e,
                    "Unit dispatch failed; unit marked failed",
                );
                GenerationUnitRepo::mark_dispatch_failed(
                    &state.pool,
                    unit_id,
                    &format!("Dispatch failed: {e}"),
                )
                .await?;
            }
        }
    }

    // One recomputation picks up any dispatch failures (including the
    // everything-failed case, which settles the job immediately).
    reconcile::recompute_job(&state.pool, job.id).await?;

    tracing::info!(
        job_id = job.id,
        user_id = auth.user_id,
        units = units.len(),
        dispatch_failures,
        "Generation job created",
    );

    Ok((StatusCode::CREATED, Json(json!({ "jobId": job.id }))))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/generations/{id}
///
/// Job status and outputs. A non-terminal stored status triggers a
/// reconciliation pass against the provider before responding; transient
/// poll failures keep the stored state.
pub async fn get_generation_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let mut job = find_and_authorize(&state.pool, job_id, &auth, "view").await?;

    if !job.status().is_terminal() {
        job = reconcile::reconcile_generation(&state, job).await?;
    }

    Ok(Json(json!({
        "jobId": job.id,
        "status": job.status().as_str(),
        "progress": job.progress_percent,
        "phase": job.phase,
        "error": job.error_message,
        "failedUnits": job.failed_units,
        "outputImages": job.output_urls,
    })))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/v1/generations/{id}
///
/// Delete a job and its units. Output images that live in our own
/// storage are removed best-effort first; provider-hosted URLs are left
/// to the provider's retention.
pub async fn delete_generation_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state.pool, job_id, &auth, "delete").await?;

    let units = GenerationUnitRepo::list_by_job(&state.pool, job.id).await?;
    for unit in &units {
        for output in unit.outputs() {
            // Only keys in our own store; http(s) URLs are provider-hosted.
            if output.starts_with("http://") || output.starts_with("https://") {
                continue;
            }
            if let Err(e) = state.storage.delete(&output).await {
                tracing::warn!(
                    unit_id = unit.id,
                    key = %output,
                    error = %e,
                    "Failed to delete stored unit image (continuing)",
                );
            }
        }
    }

    GenerationJobRepo::delete(&state.pool, job.id).await?;

    tracing::info!(job_id, user_id = auth.user_id, "Generation job deleted");

    Ok(StatusCode::NO_CONTENT)
}
