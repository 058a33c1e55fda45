//! Integration tests for generation job creation, lazy status reads, and
//! deletion.
//!
//! The unreachable test provider makes every dispatch and poll fail,
//! exercising the collected-per-unit failure path on create and the
//! keep-last-known-good rule on reads.

mod common;

use axum::http::StatusCode;
use common::{delete_auth, expect_status, get_auth, post_json_auth, seed_user};
use serde_json::json;
use sqlx::PgPool;

use atelier_core::status::{GenerationUnitStatus, TrainingStatus};
use atelier_core::types::DbId;
use atelier_db::repositories::{
    GenerationJobRepo, GenerationUnitRepo, TrainingJobRepo,
};

/// Seed a trained (ready) model so generation requests pass validation.
async fn seed_ready_model(pool: &PgPool, user_id: DbId) {
    let job = TrainingJobRepo::create(pool, user_id, "TOKJJJ88", "atelier-test", "gen-model")
        .await
        .unwrap();
    TrainingJobRepo::mark_ready(
        pool,
        job.id,
        Some("atelier-test/gen-model:abc123"),
        "https://w.example/w.bin",
    )
    .await
    .unwrap();
    assert_eq!(
        TrainingJobRepo::find_by_id(pool, job.id)
            .await
            .unwrap()
            .unwrap()
            .status(),
        TrainingStatus::Ready
    );
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_requires_a_trained_model(pool: PgPool) {
    let state = common::test_state(pool.clone());
    let (_, token) = seed_user(&pool, "g1@example.com").await;

    let app = common::build_test_app(&state);
    let json = expect_status(
        post_json_auth(
            app,
            "/api/v1/generations",
            &token,
            json!({ "prompt": "studio portrait" }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_rejects_invalid_prompt_and_variant_counts(pool: PgPool) {
    let state = common::test_state(pool.clone());
    let (user_id, token) = seed_user(&pool, "g2@example.com").await;
    seed_ready_model(&pool, user_id).await;

    let app = common::build_test_app(&state);
    expect_status(
        post_json_auth(app, "/api/v1/generations", &token, json!({ "prompt": "" })).await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let app = common::build_test_app(&state);
    expect_status(
        post_json_auth(
            app,
            "/api/v1/generations",
            &token,
            json!({ "prompt": "ok", "num_variants": 99 }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_returns_job_id_and_collects_dispatch_failures(pool: PgPool) {
    let state = common::test_state(pool.clone());
    let (user_id, token) = seed_user(&pool, "g3@example.com").await;
    seed_ready_model(&pool, user_id).await;

    // Dispatch against the unreachable provider: the request still
    // returns a job id, each unit records its own failure, and the job
    // settles as failed instead of hanging in queued.
    let app = common::build_test_app(&state);
    let json = expect_status(
        post_json_auth(
            app,
            "/api/v1/generations",
            &token,
            json!({ "prompt": "studio portrait", "num_variants": 3 }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    let job_id = json["jobId"].as_i64().expect("jobId must be numeric");

    let units = GenerationUnitRepo::list_by_job(&pool, job_id).await.unwrap();
    assert_eq!(units.len(), 3);
    for unit in &units {
        assert_eq!(unit.status(), GenerationUnitStatus::Failed);
        assert!(unit.error_message.as_deref().unwrap_or("").contains("Dispatch failed"));
    }

    let app = common::build_test_app(&state);
    let json = expect_status(
        get_auth(app, &format!("/api/v1/generations/{job_id}"), &token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["status"], "failed");
    assert_eq!(json["failedUnits"], 3);
}

// ---------------------------------------------------------------------------
// Status reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_polls_preserve_last_known_state(pool: PgPool) {
    let state = common::test_state(pool.clone());
    let (user_id, token) = seed_user(&pool, "g4@example.com").await;

    let (job, units) = GenerationJobRepo::create_with_units(&pool, user_id, "a portrait", 2)
        .await
        .unwrap();
    for (i, unit) in units.iter().enumerate() {
        GenerationUnitRepo::set_external_id(&pool, unit.id, &format!("poll-{}", i + 1))
            .await
            .unwrap();
    }

    // First unit already succeeded (e.g. via webhook); second still out.
    GenerationUnitRepo::apply_update(
        &pool,
        units[0].id,
        GenerationUnitStatus::Succeeded,
        Some(&json!(["https://img.example/1.png"])),
        None,
    )
    .await
    .unwrap();

    // The status read polls the pending unit, the poll fails (provider
    // unreachable), and the stored state is preserved: still running,
    // with the first unit's output already visible.
    let app = common::build_test_app(&state);
    let body = expect_status(
        get_auth(app, &format!("/api/v1/generations/{}", job.id), &token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["status"], "running");
    assert_eq!(body["progress"], 50);
    assert_eq!(body["outputImages"], json!(["https://img.example/1.png"]));

    let units_after = GenerationUnitRepo::list_by_job(&pool, job.id).await.unwrap();
    assert_eq!(units_after[1].status(), GenerationUnitStatus::Queued);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn terminal_aggregate_is_pure_function_of_units(pool: PgPool) {
    let state = common::test_state(pool.clone());
    let (user_id, token) = seed_user(&pool, "g5@example.com").await;

    let (job, units) = GenerationJobRepo::create_with_units(&pool, user_id, "a portrait", 3)
        .await
        .unwrap();

    // Land the unit outcomes directly (arrival order scrambled relative
    // to creation order); the parent must still report outputs in
    // unit-creation order.
    GenerationUnitRepo::apply_update(
        &pool,
        units[2].id,
        GenerationUnitStatus::Failed,
        None,
        Some("NSFW filter"),
    )
    .await
    .unwrap();
    GenerationUnitRepo::apply_update(
        &pool,
        units[1].id,
        GenerationUnitStatus::Succeeded,
        Some(&json!(["https://img.example/b.png"])),
        None,
    )
    .await
    .unwrap();
    GenerationUnitRepo::apply_update(
        &pool,
        units[0].id,
        GenerationUnitStatus::Succeeded,
        Some(&json!(["https://img.example/a.png"])),
        None,
    )
    .await
    .unwrap();

    let app = common::build_test_app(&state);
    let body = expect_status(
        get_auth(app, &format!("/api/v1/generations/{}", job.id), &token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["status"], "succeeded_partial");
    assert_eq!(body["failedUnits"], 1);
    assert_eq!(
        body["outputImages"],
        json!(["https://img.example/a.png", "https://img.example/b.png"])
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reading_another_users_job_is_forbidden(pool: PgPool) {
    let state = common::test_state(pool.clone());
    let (user_a, _) = seed_user(&pool, "g6a@example.com").await;
    let (_, token_b) = seed_user(&pool, "g6b@example.com").await;

    let (job, _) = GenerationJobRepo::create_with_units(&pool, user_a, "a portrait", 1)
        .await
        .unwrap();

    let app = common::build_test_app(&state);
    expect_status(
        get_auth(app, &format!("/api/v1/generations/{}", job.id), &token_b).await,
        StatusCode::FORBIDDEN,
    )
    .await;
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_cascades_to_units(pool: PgPool) {
    let state = common::test_state(pool.clone());
    let (user_id, token) = seed_user(&pool, "g7@example.com").await;

    let (job, _) = GenerationJobRepo::create_with_units(&pool, user_id, "a portrait", 2)
        .await
        .unwrap();

    let app = common::build_test_app(&state);
    let response = delete_auth(app, &format!("/api/v1/generations/{}", job.id), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(GenerationJobRepo::find_by_id(&pool, job.id).await.unwrap().is_none());
    assert!(GenerationUnitRepo::list_by_job(&pool, job.id).await.unwrap().is_empty());

    // A webhook for the deleted job's unit must be a benign no-op; the
    // ledger records it and nothing else happens (covered in the webhook
    // suite's unknown-id test).
}
