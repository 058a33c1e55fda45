//! Handlers for the `/photos` resource.
//!
//! Uploads validate type/size/dimensions, fingerprint the bytes for the
//! per-user duplicate check, and store the original before persisting the
//! row. Every add and remove runs the dataset change gate, which is what
//! moves a `ready` model to `stale` when its training set changes.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use atelier_core::dataset::{self, DatasetChangeEffect};
use atelier_core::error::CoreError;
use atelier_core::photos;
use atelier_core::status::TrainingStatus;
use atelier_core::types::DbId;
use atelier_db::repositories::{TrainingJobRepo, TrainingPhotoRepo};
use atelier_storage::StorageProvider;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field name carrying the photo bytes.
const PHOTO_FIELD: &str = "photo";

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Run the dataset change gate after a mutation and apply its effect.
///
/// Returns the effect so handlers can surface it to the caller. The gate
/// is keyed on the model's current status, so repeated mutations
/// coalesce: only the first one actually invalidates.
async fn apply_dataset_gate(
    state: &AppState,
    user_id: DbId,
) -> Result<DatasetChangeEffect, AppError> {
    let photo_count = TrainingPhotoRepo::count_by_user(&state.pool, user_id).await?;
    let job = TrainingJobRepo::find_by_user(&state.pool, user_id).await?;

    let effect = dataset::evaluate(
        photo_count,
        state.config.training.min_photos,
        job.as_ref().map(|j| j.status()),
    );

    if effect == DatasetChangeEffect::Invalidate {
        if let Some(job) = &job {
            let invalidated = TrainingJobRepo::mark_stale(&state.pool, job.id).await?;
            if invalidated {
                tracing::info!(
                    job_id = job.id,
                    user_id,
                    "Training set changed; model marked stale",
                );
            }
        }
    }

    Ok(effect)
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// POST /api/v1/photos
///
/// Upload one training photo as multipart form data (field `photo`).
/// Returns 409 when the user already uploaded identical bytes.
pub async fn upload_photo(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let existing = TrainingPhotoRepo::count_by_user(&state.pool, auth.user_id).await?;
    if existing >= state.config.training.max_photos {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Photo limit reached ({} max). Delete photos before uploading more",
            state.config.training.max_photos
        ))));
    }

    let (content_type, bytes) = read_photo_field(&mut multipart).await?;

    photos::validate_upload(&content_type, bytes.len()).map_err(AppError::Core)?;

    let (width, height) = image_dimensions(&bytes)?;
    photos::validate_dimensions(width, height).map_err(AppError::Core)?;

    let content_hash = photos::content_fingerprint(&bytes);
    if TrainingPhotoRepo::find_by_user_and_hash(&state.pool, auth.user_id, &content_hash)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "This photo was already uploaded".into(),
        )));
    }

    // The extension is guaranteed by validate_upload above.
    let ext = photos::extension_for(&content_type).unwrap_or("bin");
    let storage_key = format!("users/{}/photos/{}.{ext}", auth.user_id, Uuid::new_v4());

    state.storage.put(&storage_key, &bytes).await?;

    // Normalization (crop/resize for the trainer) happens out of process;
    // until it runs, the normalized key mirrors the original.
    let photo = TrainingPhotoRepo::create(
        &state.pool,
        auth.user_id,
        &storage_key,
        Some(&storage_key),
        width as i32,
        height as i32,
        &content_hash,
        &content_type,
        bytes.len() as i64,
    )
    .await?;

    let effect = apply_dataset_gate(&state, auth.user_id).await?;

    tracing::info!(
        photo_id = photo.id,
        user_id = auth.user_id,
        width,
        height,
        dataset_effect = effect.as_str(),
        "Photo uploaded",
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "data": photo,
            "datasetEffect": effect.as_str(),
        })),
    ))
}

/// Pull the photo field out of the multipart stream.
async fn read_photo_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .ok_or_else(|| AppError::BadRequest("Photo field is missing a content type".into()))?
            .to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read photo bytes: {e}")))?;

        return Ok((content_type, bytes.to_vec()));
    }

    Err(AppError::BadRequest(format!(
        "Multipart body is missing a '{PHOTO_FIELD}' field"
    )))
}

/// Extract pixel dimensions from the image header without decoding the
/// full bitmap.
fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), AppError> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::BadRequest(format!("Unreadable image data: {e}")))?
        .into_dimensions()
        .map_err(|e| AppError::BadRequest(format!("Could not read image dimensions: {e}")))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/photos
///
/// List the caller's photos, oldest first.
pub async fn list_photos(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let photos = TrainingPhotoRepo::list_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: photos }))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/v1/photos/{id}
///
/// Delete one photo. Rejected while the photo is committed into an
/// in-flight training run. Deleting a photo from a `ready` model's
/// training set marks the model stale; an immediate second delete finds
/// the model already stale and does not re-trigger.
pub async fn delete_photo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let photo = TrainingPhotoRepo::find_by_id(&state.pool, photo_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Photo",
            id: photo_id,
        }))?;

    if photo.user_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot delete another user's photo".into(),
        )));
    }

    // A photo committed into a run that is still training is locked: the
    // uploaded bundle already references it remotely.
    if let Some(job_id) = photo.training_job_id {
        if let Some(job) = TrainingJobRepo::find_by_id(&state.pool, job_id).await? {
            if job.status() == TrainingStatus::Training {
                return Err(AppError::Core(CoreError::Conflict(
                    "Photos are locked while training is in progress".into(),
                )));
            }
        }
    }

    // Storage cleanup is best-effort; persistence is the source of truth
    // for what the user sees next.
    if let Err(e) = state.storage.delete(&photo.storage_key).await {
        tracing::warn!(
            photo_id,
            key = %photo.storage_key,
            error = %e,
            "Failed to delete stored photo (continuing)",
        );
    }

    TrainingPhotoRepo::delete(&state.pool, photo_id).await?;

    let effect = apply_dataset_gate(&state, auth.user_id).await?;

    tracing::info!(
        photo_id,
        user_id = auth.user_id,
        dataset_effect = effect.as_str(),
        "Photo deleted",
    );

    Ok(Json(json!({
        "deleted": true,
        "datasetEffect": effect.as_str(),
    })))
}
