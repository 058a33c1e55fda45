//! Reconciliation of stored job state with provider-reported outcomes.
//!
//! Two entry points feed this module: webhook deliveries (push) and lazy
//! status-read polls (pull). Both converge on the same transition
//! functions below, so it does not matter which source observes a
//! terminal outcome first -- the guarded repository updates let the first
//! observer win and turn the second into a no-op.
//!
//! Poll failures never move the state machine. Only an actual provider
//! signal changes state; a transient poll error is logged and the stored
//! state is left for the next webhook or poll attempt.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use sqlx::PgPool;

use atelier_core::generation::{self, JobAggregate};
use atelier_core::status::{GenerationJobStatus, GenerationUnitStatus, TrainingStatus};
use atelier_core::training::{self, TrainingOutcome};
use atelier_core::types::DbId;
use atelier_db::models::generation_job::GenerationJob;
use atelier_db::models::generation_unit::GenerationUnit;
use atelier_db::models::training_job::TrainingJob;
use atelier_db::repositories::{GenerationJobRepo, GenerationUnitRepo, TrainingJobRepo};

use crate::state::AppState;

/// Concurrent provider polls per reconciliation pass. Small and fixed to
/// respect upstream rate limits while still overlapping I/O latency.
const POLL_CONCURRENCY: usize = 2;

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

/// Apply a training outcome to a stored job.
///
/// This is the single transition function for training completion,
/// called by both the webhook handler and [`reconcile_training`].
/// Returns whether anything was written: re-applying the same terminal
/// outcome, or applying one to an already-settled job, changes nothing.
pub async fn apply_training_outcome(
    pool: &PgPool,
    job: &TrainingJob,
    outcome: &TrainingOutcome,
) -> Result<bool, sqlx::Error> {
    let applied = match outcome {
        // Non-terminal provider statuses carry no new information over
        // the stored `training` status.
        TrainingOutcome::Pending => false,

        TrainingOutcome::Succeeded {
            version,
            weights_url,
        } => match weights_url {
            Some(url) => {
                let applied =
                    TrainingJobRepo::mark_ready(pool, job.id, version.as_deref(), url).await?;
                if applied {
                    tracing::info!(
                        job_id = job.id,
                        user_id = job.user_id,
                        model = %job.model_ref(),
                        "Training completed; model ready",
                    );
                }
                applied
            }
            // Succeeded upstream, but no extractor recognized a weights
            // URL in the output: the trainer's schema drifted further
            // than the candidate list covers. Without weights the model
            // is unusable, so the run is recorded as failed.
            None => {
                let applied = TrainingJobRepo::mark_finished(
                    pool,
                    job.id,
                    TrainingStatus::Failed,
                    "Training succeeded but its output contained no recognizable weights URL",
                )
                .await?;
                if applied {
                    tracing::error!(
                        job_id = job.id,
                        "Training output contained no recognizable weights URL; marking failed",
                    );
                }
                applied
            }
        },

        TrainingOutcome::Failed { message } => {
            let applied =
                TrainingJobRepo::mark_finished(pool, job.id, TrainingStatus::Failed, message)
                    .await?;
            if applied {
                tracing::info!(job_id = job.id, error = %message, "Training failed");
            }
            applied
        }

        TrainingOutcome::Canceled { message } => {
            let applied =
                TrainingJobRepo::mark_finished(pool, job.id, TrainingStatus::Canceled, message)
                    .await?;
            if applied {
                tracing::info!(job_id = job.id, "Training canceled");
            }
            applied
        }
    };

    Ok(applied)
}

/// Pull entry point: poll the provider for a training still in flight
/// and apply the outcome.
///
/// Returns the refreshed row. A failed poll (or a job whose remote run
/// was never created) returns the row unchanged.
pub async fn reconcile_training(
    state: &AppState,
    job: TrainingJob,
) -> Result<TrainingJob, sqlx::Error> {
    let Some(external_id) = job.external_training_id.clone() else {
        // The row exists but the remote run was never created (the
        // provider call failed during start). There is nothing to poll;
        // a retrain or reset resolves this.
        return Ok(job);
    };

    match state.replicate.get_training(&external_id).await {
        Ok(remote) => {
            let outcome = training::parse_outcome(
                &remote.status,
                remote.output.as_ref(),
                remote.error.as_deref(),
            );
            apply_training_outcome(&state.pool, &job, &outcome).await?;

            Ok(TrainingJobRepo::find_by_id(&state.pool, job.id)
                .await?
                .unwrap_or(job))
        }
        Err(e) => {
            tracing::warn!(
                job_id = job.id,
                error = %e,
                "Training status poll failed; keeping stored state",
            );
            Ok(job)
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Apply a provider status update to one unit, then recompute the parent.
///
/// The unit update is guarded (terminal units never regress); the parent
/// is always recomputed from the full unit set afterward, never patched
/// incrementally.
pub async fn apply_unit_update(
    pool: &PgPool,
    unit: &GenerationUnit,
    status: GenerationUnitStatus,
    output: Option<&Value>,
    error: Option<&str>,
) -> Result<(), sqlx::Error> {
    let outputs = output.map(normalize_outputs);
    let applied =
        GenerationUnitRepo::apply_update(pool, unit.id, status, outputs.as_ref(), error).await?;

    if applied {
        tracing::debug!(
            unit_id = unit.id,
            job_id = unit.job_id,
            status = status.as_str(),
            "Generation unit updated",
        );
    }

    recompute_job(pool, unit.job_id).await
}

/// Recompute a parent job's status block from its full unit set.
pub async fn recompute_job(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
    let units = GenerationUnitRepo::list_by_job(pool, job_id).await?;
    let statuses: Vec<GenerationUnitStatus> = units.iter().map(GenerationUnit::status).collect();

    let aggregate = generation::aggregate(&statuses);
    let progress = generation::progress_percent(&statuses);
    let phase = generation::phase(&statuses);

    let (status, failed_units) = match aggregate {
        JobAggregate::Queued => (GenerationJobStatus::Queued, 0),
        JobAggregate::Running => (GenerationJobStatus::Running, 0),
        JobAggregate::Succeeded => (GenerationJobStatus::Succeeded, 0),
        JobAggregate::SucceededPartial { failed_units } => {
            (GenerationJobStatus::SucceededPartial, failed_units as i32)
        }
        JobAggregate::Failed => (GenerationJobStatus::Failed, statuses.len() as i32),
        JobAggregate::Canceled => (GenerationJobStatus::Canceled, 0),
    };

    // Outputs concatenate in unit-creation order (`list_by_job` orders
    // by id); only succeeded units contribute.
    let outputs: Vec<String> = units
        .iter()
        .filter(|u| u.status() == GenerationUnitStatus::Succeeded)
        .flat_map(|u| u.outputs())
        .collect();

    let error_message = match status {
        GenerationJobStatus::Failed | GenerationJobStatus::Canceled => units
            .iter()
            .find_map(|u| u.error_message.clone()),
        _ => None,
    };

    let applied = GenerationJobRepo::apply_aggregate(
        pool,
        job_id,
        status,
        progress,
        phase,
        &serde_json::json!(outputs),
        failed_units,
        error_message.as_deref(),
    )
    .await?;

    if applied && status.is_terminal() {
        tracing::info!(
            job_id,
            status = status.as_str(),
            failed_units,
            output_count = outputs.len(),
            "Generation job reached terminal status",
        );
    }

    Ok(())
}

/// Pull entry point: poll every non-terminal unit of a job and recompute
/// the parent once.
///
/// Per-unit poll failures are logged and skipped; the units keep their
/// stored status for the next attempt.
pub async fn reconcile_generation(
    state: &AppState,
    job: GenerationJob,
) -> Result<GenerationJob, sqlx::Error> {
    let units = GenerationUnitRepo::list_by_job(&state.pool, job.id).await?;

    // Units without an external ID are either awaiting dispatch results
    // or permanently failed at dispatch; there is nothing to poll.
    let pending: Vec<(DbId, String)> = units
        .iter()
        .filter(|u| !u.status().is_terminal())
        .filter_map(|u| u.external_prediction_id.clone().map(|ext| (u.id, ext)))
        .collect();

    let polls: Vec<(DbId, Result<atelier_replicate::RemotePrediction, _>)> = stream::iter(pending)
        .map(|(unit_id, external_id)| {
            let api = Arc::clone(&state.replicate);
            async move { (unit_id, api.get_prediction(&external_id).await) }
        })
        .buffer_unordered(POLL_CONCURRENCY)
        .collect()
        .await;

    for (unit_id, result) in polls {
        match result {
            Ok(remote) => {
                let Some(status) = GenerationUnitStatus::from_provider(&remote.status) else {
                    continue;
                };
                let outputs = remote.output.as_ref().map(normalize_outputs);
                GenerationUnitRepo::apply_update(
                    &state.pool,
                    unit_id,
                    status,
                    outputs.as_ref(),
                    remote.error.as_deref(),
                )
                .await?;
            }
            Err(e) => {
                tracing::warn!(
                    unit_id,
                    job_id = job.id,
                    error = %e,
                    "Unit status poll failed; keeping stored state",
                );
            }
        }
    }

    recompute_job(&state.pool, job.id).await?;

    Ok(GenerationJobRepo::find_by_id(&state.pool, job.id)
        .await?
        .unwrap_or(job))
}

/// Normalize a provider output payload into a JSON array of URLs.
///
/// Predictions return either a bare URL string or an array of them
/// depending on the model; the stored form is always an array.
pub fn normalize_outputs(output: &Value) -> Value {
    match output {
        Value::Array(_) => output.clone(),
        Value::String(url) => Value::Array(vec![Value::String(url.clone())]),
        _ => Value::Array(Vec::new()),
    }
}
