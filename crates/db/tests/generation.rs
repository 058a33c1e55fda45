//! Generation persistence: creation fan-out, guarded unit updates, and
//! unit ordering.

use serde_json::json;
use sqlx::PgPool;

use atelier_core::status::{GenerationJobStatus, GenerationUnitStatus};
use atelier_core::types::DbId;
use atelier_db::repositories::{GenerationJobRepo, GenerationUnitRepo, UserRepo};

async fn seed_user(pool: &PgPool, email: &str) -> DbId {
    UserRepo::create(pool, email, "Test User").await.unwrap().id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_with_units_persists_job_and_queued_units(pool: PgPool) {
    let user_id = seed_user(&pool, "gen-create@example.com").await;

    let (job, units) = GenerationJobRepo::create_with_units(&pool, user_id, "a portrait", 4)
        .await
        .unwrap();

    assert_eq!(job.status(), GenerationJobStatus::Queued);
    assert_eq!(units.len(), 4);
    for unit in &units {
        assert_eq!(unit.job_id, job.id);
        assert_eq!(unit.status(), GenerationUnitStatus::Queued);
        assert_eq!(unit.external_prediction_id, None);
    }

    // Listing returns creation order.
    let listed = GenerationUnitRepo::list_by_job(&pool, job.id).await.unwrap();
    let ids: Vec<DbId> = listed.iter().map(|u| u.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unit_updates_are_guarded_against_regression(pool: PgPool) {
    let user_id = seed_user(&pool, "gen-guard@example.com").await;
    let (_, units) = GenerationJobRepo::create_with_units(&pool, user_id, "a portrait", 1)
        .await
        .unwrap();
    let unit_id = units[0].id;

    // Queued -> Running -> Succeeded all apply.
    assert!(GenerationUnitRepo::apply_update(
        &pool,
        unit_id,
        GenerationUnitStatus::Running,
        None,
        None
    )
    .await
    .unwrap());
    assert!(GenerationUnitRepo::apply_update(
        &pool,
        unit_id,
        GenerationUnitStatus::Succeeded,
        Some(&json!(["https://img.example/a.png"])),
        None
    )
    .await
    .unwrap());

    // Terminal: neither a replayed success nor a late failure applies.
    assert!(!GenerationUnitRepo::apply_update(
        &pool,
        unit_id,
        GenerationUnitStatus::Succeeded,
        Some(&json!(["https://img.example/other.png"])),
        None
    )
    .await
    .unwrap());
    assert!(!GenerationUnitRepo::apply_update(
        &pool,
        unit_id,
        GenerationUnitStatus::Failed,
        None,
        Some("late")
    )
    .await
    .unwrap());

    let units = GenerationUnitRepo::list_by_job(&pool, units[0].job_id).await.unwrap();
    assert_eq!(units[0].status(), GenerationUnitStatus::Succeeded);
    assert_eq!(units[0].outputs(), vec!["https://img.example/a.png"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn updates_preserve_existing_outputs_when_absent(pool: PgPool) {
    let user_id = seed_user(&pool, "gen-coalesce@example.com").await;
    let (_, units) = GenerationJobRepo::create_with_units(&pool, user_id, "a portrait", 1)
        .await
        .unwrap();
    let unit_id = units[0].id;

    GenerationUnitRepo::apply_update(
        &pool,
        unit_id,
        GenerationUnitStatus::Running,
        Some(&json!(["https://img.example/partial.png"])),
        None,
    )
    .await
    .unwrap();

    // A status-only update must not clobber previously stored outputs.
    GenerationUnitRepo::apply_update(&pool, unit_id, GenerationUnitStatus::Running, None, None)
        .await
        .unwrap();

    let units = GenerationUnitRepo::list_by_job(&pool, units[0].job_id).await.unwrap();
    assert_eq!(units[0].outputs(), vec!["https://img.example/partial.png"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn aggregate_writes_stop_once_job_is_terminal(pool: PgPool) {
    let user_id = seed_user(&pool, "gen-terminal@example.com").await;
    let (job, _) = GenerationJobRepo::create_with_units(&pool, user_id, "a portrait", 1)
        .await
        .unwrap();

    assert!(GenerationJobRepo::apply_aggregate(
        &pool,
        job.id,
        GenerationJobStatus::Succeeded,
        100,
        "complete",
        &json!(["https://img.example/a.png"]),
        0,
        None,
    )
    .await
    .unwrap());

    // Identical recomputations of a settled job are refused writes.
    assert!(!GenerationJobRepo::apply_aggregate(
        &pool,
        job.id,
        GenerationJobStatus::Failed,
        100,
        "complete",
        &json!([]),
        1,
        Some("late"),
    )
    .await
    .unwrap());

    let row = GenerationJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status(), GenerationJobStatus::Succeeded);
    assert!(row.completed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_cascades_units(pool: PgPool) {
    let user_id = seed_user(&pool, "gen-delete@example.com").await;
    let (job, _) = GenerationJobRepo::create_with_units(&pool, user_id, "a portrait", 3)
        .await
        .unwrap();

    assert!(GenerationJobRepo::delete(&pool, job.id).await.unwrap());
    assert!(GenerationJobRepo::find_by_id(&pool, job.id).await.unwrap().is_none());
    assert!(GenerationUnitRepo::list_by_job(&pool, job.id).await.unwrap().is_empty());
}
