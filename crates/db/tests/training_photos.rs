//! Training photo persistence: per-user dedupe, commit/unlink, and bulk
//! deletion.

use sqlx::PgPool;

use atelier_core::types::DbId;
use atelier_db::repositories::{TrainingJobRepo, TrainingPhotoRepo, UserRepo};

async fn seed_user(pool: &PgPool, email: &str) -> DbId {
    UserRepo::create(pool, email, "Test User").await.unwrap().id
}

async fn seed_photo(pool: &PgPool, user_id: DbId, hash: &str) -> DbId {
    TrainingPhotoRepo::create(
        pool,
        user_id,
        &format!("users/{user_id}/photos/{hash}.jpg"),
        None,
        512,
        512,
        hash,
        "image/jpeg",
        1024,
    )
    .await
    .unwrap()
    .id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_hash_is_per_user(pool: PgPool) {
    let user_a = seed_user(&pool, "ph-a@example.com").await;
    let user_b = seed_user(&pool, "ph-b@example.com").await;

    seed_photo(&pool, user_a, "aaaa").await;

    // Same user, same bytes: blocked by the unique constraint.
    let err = TrainingPhotoRepo::create(
        &pool, user_a, "users/a/photos/dup.jpg", None, 512, 512, "aaaa", "image/jpeg", 1024,
    )
    .await
    .unwrap_err();
    let db_err = err.as_database_error().expect("expected a database error");
    assert_eq!(db_err.constraint(), Some("uq_training_photos_user_hash"));

    // Different user, same bytes: fine.
    seed_photo(&pool, user_b, "aaaa").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn linking_commits_only_uncommitted_photos(pool: PgPool) {
    let user_id = seed_user(&pool, "ph-link@example.com").await;
    for n in 0..3 {
        seed_photo(&pool, user_id, &format!("hash-{n}")).await;
    }

    let job = TrainingJobRepo::create(&pool, user_id, "TOKPPPP2", "acct", "m")
        .await
        .unwrap();

    assert_eq!(
        TrainingPhotoRepo::link_uncommitted(&pool, user_id, job.id).await.unwrap(),
        3
    );
    assert!(TrainingPhotoRepo::list_uncommitted(&pool, user_id).await.unwrap().is_empty());

    // A photo uploaded after the run started stays uncommitted.
    seed_photo(&pool, user_id, "hash-late").await;
    let uncommitted = TrainingPhotoRepo::list_uncommitted(&pool, user_id).await.unwrap();
    assert_eq!(uncommitted.len(), 1);

    // Unlink precedes any hard delete of the job.
    assert_eq!(TrainingPhotoRepo::unlink_for_job(&pool, job.id).await.unwrap(), 3);
    assert_eq!(
        TrainingPhotoRepo::list_uncommitted(&pool, user_id).await.unwrap().len(),
        4
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_job_row_unlinks_photos_via_fk(pool: PgPool) {
    let user_id = seed_user(&pool, "ph-fk@example.com").await;
    seed_photo(&pool, user_id, "hash-fk").await;

    let job = TrainingJobRepo::create(&pool, user_id, "TOKQQQQ3", "acct", "m")
        .await
        .unwrap();
    TrainingPhotoRepo::link_uncommitted(&pool, user_id, job.id).await.unwrap();

    TrainingJobRepo::delete(&pool, job.id).await.unwrap();

    let photos = TrainingPhotoRepo::list_by_user(&pool, user_id).await.unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].training_job_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bulk_delete_returns_storage_keys(pool: PgPool) {
    let user_id = seed_user(&pool, "ph-bulk@example.com").await;
    for n in 0..3 {
        seed_photo(&pool, user_id, &format!("hash-bulk-{n}")).await;
    }

    let keys = TrainingPhotoRepo::delete_all_for_user(&pool, user_id).await.unwrap();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|k| k.starts_with(&format!("users/{user_id}/"))));
    assert_eq!(TrainingPhotoRepo::count_by_user(&pool, user_id).await.unwrap(), 0);
}
