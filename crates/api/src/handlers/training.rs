//! Handlers for the `/training` resource.
//!
//! Starting a run packages the user's uncommitted photos into a bundle,
//! uploads it, and creates the remote training. Once the remote run may
//! exist, the local row is never silently reverted: provider failures
//! surface as integration errors while the row stays in `training`, and
//! the webhook/poll reconciliation finishes the story.

use std::io::Write;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{self, StreamExt};
use serde_json::json;
use uuid::Uuid;

use atelier_core::error::CoreError;
use atelier_core::status::TrainingStatus;
use atelier_core::trigger_word;
use atelier_db::models::training_job::ResetTrainingRequest;
use atelier_db::models::training_photo::{PhotoSummary, TrainingPhoto};
use atelier_db::repositories::{TrainingJobRepo, TrainingPhotoRepo};
use atelier_storage::{StorageError, StorageProvider};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::reconcile;
use crate::response::DataResponse;
use crate::state::AppState;

/// Concurrent storage reads while assembling the photo bundle.
const BUNDLE_FETCH_CONCURRENCY: usize = 2;

/// Training steps requested from the trainer.
const TRAINING_STEPS: u32 = 1000;

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// POST /api/v1/training/start
///
/// Start a training run from the caller's uncommitted photos.
///
/// Preconditions: no job in `training` or `ready` (409), and at least the
/// configured minimum photo count (400). A settled previous job
/// (failed/canceled/stale) is replaced.
pub async fn start_training(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    if let Some(existing) = TrainingJobRepo::find_by_user(&state.pool, auth.user_id).await? {
        match existing.status() {
            TrainingStatus::Training => {
                return Err(AppError::Core(CoreError::Conflict(
                    "A training run is already in progress".into(),
                )));
            }
            TrainingStatus::Ready => {
                return Err(AppError::Core(CoreError::Conflict(
                    "A trained model already exists. Reset it before retraining".into(),
                )));
            }
            // Failed, canceled, or stale: replace the old row. Unlink
            // first so every photo is uncommitted again and counts
            // toward the new run.
            _ => {
                TrainingPhotoRepo::unlink_for_job(&state.pool, existing.id).await?;
                TrainingJobRepo::delete(&state.pool, existing.id).await?;
                tracing::info!(
                    old_job_id = existing.id,
                    user_id = auth.user_id,
                    "Replaced settled training job for retrain",
                );
            }
        }
    }

    let photos = TrainingPhotoRepo::list_uncommitted(&state.pool, auth.user_id).await?;
    let min_photos = state.config.training.min_photos;
    if (photos.len() as i64) < min_photos {
        return Err(AppError::Core(CoreError::Validation(format!(
            "At least {min_photos} photos are required to start training (have {})",
            photos.len()
        ))));
    }

    let trigger = trigger_word::generate().map_err(AppError::Core)?;
    let model_owner = state.config.provider.model_owner.clone();
    let model_name = format!(
        "user-{}-{}",
        auth.user_id,
        &Uuid::new_v4().simple().to_string()[..8]
    );

    // A concurrent start for the same user loses here on the per-user
    // unique constraint and surfaces as a conflict.
    let job = TrainingJobRepo::create(
        &state.pool,
        auth.user_id,
        &trigger,
        &model_owner,
        &model_name,
    )
    .await?;

    let linked = TrainingPhotoRepo::link_uncommitted(&state.pool, auth.user_id, job.id).await?;

    // Assemble the photo bundle. A photo missing from storage aborts the
    // start before any remote resource exists, so the row is rolled back
    // rather than left dangling.
    let bundle = match build_photo_bundle(&state, &photos).await {
        Ok(bundle) => bundle,
        Err(e) => {
            TrainingPhotoRepo::unlink_for_job(&state.pool, job.id).await?;
            TrainingJobRepo::delete(&state.pool, job.id).await?;
            return Err(e);
        }
    };

    // From here on the provider may hold resources for this run; the row
    // stays in `training` on failure instead of silently reverting.
    state.replicate.create_model(&model_owner, &model_name).await?;

    let uploaded = state
        .replicate
        .upload_file(&format!("{model_name}.zip"), bundle)
        .await?;

    let input = json!({
        "input_images": uploaded.urls.get,
        "trigger_word": &trigger,
        "steps": TRAINING_STEPS,
    });
    let remote = state
        .replicate
        .create_training(
            &job.model_ref(),
            &input,
            state.config.webhook_callback_url().as_deref(),
        )
        .await?;

    TrainingJobRepo::set_external_training_id(&state.pool, job.id, &remote.id).await?;

    tracing::info!(
        job_id = job.id,
        user_id = auth.user_id,
        external_id = %remote.id,
        photo_count = linked,
        trigger_word = %trigger,
        "Training run started",
    );

    let job = TrainingJobRepo::find_by_id(&state.pool, job.id)
        .await?
        .unwrap_or(job);
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// Fetch every photo's original bytes (bounded concurrency) and pack
/// them into an uncompressed zip -- the images are already compressed.
async fn build_photo_bundle(
    state: &AppState,
    photos: &[TrainingPhoto],
) -> Result<Vec<u8>, AppError> {
    let prepared: Vec<(String, String)> = photos
        .iter()
        .map(|photo| (photo.storage_key.clone(), bundle_entry_name(photo)))
        .collect();
    let fetches: Vec<(String, Result<Vec<u8>, StorageError>)> = stream::iter(prepared)
        .map(|(key, name)| {
            let storage = Arc::clone(&state.storage);
            async move {
                let bytes = storage.get(&key).await;
                (name, bytes)
            }
        })
        .buffer_unordered(BUNDLE_FETCH_CONCURRENCY)
        .collect()
        .await;

    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, result) in fetches {
        let bytes = result?;
        writer
            .start_file(name, options)
            .map_err(|e| AppError::InternalError(format!("Failed to build photo bundle: {e}")))?;
        writer
            .write_all(&bytes)
            .map_err(|e| AppError::InternalError(format!("Failed to build photo bundle: {e}")))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| AppError::InternalError(format!("Failed to build photo bundle: {e}")))?;
    Ok(cursor.into_inner())
}

/// Stable bundle entry name; keyed on the photo ID so concurrent fetch
/// completion order does not matter.
fn bundle_entry_name(photo: &TrainingPhoto) -> String {
    let ext = photo
        .storage_key
        .rsplit('.')
        .next()
        .unwrap_or("jpg");
    format!("photo-{}.{ext}", photo.id)
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/training/status
///
/// Current training state plus the photo set. When the stored status is
/// still `training`, a poll reconciliation runs first so the response
/// reflects any outcome the webhook path missed; poll failures keep the
/// stored state and never surface to the caller.
pub async fn training_status(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let photos = TrainingPhotoRepo::list_by_user(&state.pool, auth.user_id).await?;
    let summaries: Vec<PhotoSummary> = photos.iter().map(PhotoSummary::from).collect();

    let job = match TrainingJobRepo::find_by_user(&state.pool, auth.user_id).await? {
        Some(job) if job.status() == TrainingStatus::Training => {
            Some(reconcile::reconcile_training(&state, job).await?)
        }
        other => other,
    };

    let Some(job) = job else {
        return Ok(Json(json!({
            "status": "none",
            "photoCount": photos.len(),
            "photos": summaries,
        })));
    };

    let status = job.status();
    let ready = status == TrainingStatus::Ready;

    Ok(Json(json!({
        "status": status.as_str(),
        "modelId": job.model_ref(),
        "triggerWord": if ready { Some(&job.trigger_word) } else { None },
        "weightsUrl": if ready { job.weights_url.as_deref() } else { None },
        "errorMessage": job.error_message,
        "photoCount": photos.len(),
        "photos": summaries,
    })))
}

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------

/// POST /api/v1/training/reset
///
/// Delete the training job (and optionally all photos). Rejected while a
/// run is in flight. The remote model delete is best-effort: persistence
/// is the source of truth for what the user sees next.
pub async fn reset_training(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ResetTrainingRequest>,
) -> AppResult<impl IntoResponse> {
    let job = TrainingJobRepo::find_by_user(&state.pool, auth.user_id).await?;

    if let Some(job) = &job {
        if job.status() == TrainingStatus::Training {
            return Err(AppError::Core(CoreError::Conflict(
                "Cannot reset while a training run is in progress".into(),
            )));
        }

        if let Err(e) = state
            .replicate
            .delete_model(&job.model_owner, &job.model_name)
            .await
        {
            tracing::warn!(
                job_id = job.id,
                model = %job.model_ref(),
                error = %e,
                "Failed to delete remote model (continuing)",
            );
        }

        TrainingPhotoRepo::unlink_for_job(&state.pool, job.id).await?;
        TrainingJobRepo::delete(&state.pool, job.id).await?;

        tracing::info!(job_id = job.id, user_id = auth.user_id, "Training reset");
    }

    if input.delete_photos {
        let keys = TrainingPhotoRepo::delete_all_for_user(&state.pool, auth.user_id).await?;
        for key in &keys {
            if let Err(e) = state.storage.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete stored photo (continuing)");
            }
        }
        tracing::info!(
            user_id = auth.user_id,
            photo_count = keys.len(),
            "Photos deleted during reset",
        );
    }

    let photo_count = TrainingPhotoRepo::count_by_user(&state.pool, auth.user_id).await?;

    let message = match (job.is_some(), input.delete_photos) {
        (true, true) => "Training and photos reset",
        (true, false) => "Training reset; photos kept",
        (false, true) => "No training to reset; photos deleted",
        (false, false) => "Nothing to reset",
    };

    Ok(Json(json!({
        "reset": true,
        "photoCount": photo_count,
        "message": message,
    })))
}
