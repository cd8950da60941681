mod common;

use aiohub_pipeline::jobs::{EnqueueOutcome, JobsRepo};
use aiohub_pipeline::PipelineError;
use common::{org_id, translation_job, try_setup_db};
use serial_test::serial;
use uuid::Uuid;

async fn job_count(pool: &sqlx::PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_jobs")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn duplicate_enqueue_while_outstanding_is_a_noop() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = JobsRepo::new(pool.clone());
    let source_id = Uuid::new_v4();

    let first = repo
        .enqueue(translation_job(org_id(), source_id, "title", "en", 5, 3))
        .await
        .unwrap();
    assert!(matches!(first, EnqueueOutcome::Created(_)));

    // Same identity, different text: still the same unit of work.
    let mut edited = translation_job(org_id(), source_id, "title", "en", 5, 3);
    edited.source_text = "edited text".to_string();
    let second = repo.enqueue(edited).await.unwrap();
    assert_eq!(second, EnqueueOutcome::Deduplicated);

    assert_eq!(job_count(&pool).await, 1);
}

#[tokio::test]
#[serial]
async fn different_target_language_is_a_different_unit() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = JobsRepo::new(pool.clone());
    let source_id = Uuid::new_v4();

    repo.enqueue(translation_job(org_id(), source_id, "title", "en", 5, 3))
        .await
        .unwrap();
    let zh = repo
        .enqueue(translation_job(org_id(), source_id, "title", "zh", 5, 3))
        .await
        .unwrap();

    assert!(matches!(zh, EnqueueOutcome::Created(_)));
    assert_eq!(job_count(&pool).await, 2);
}

#[tokio::test]
#[serial]
async fn terminal_job_does_not_block_a_new_enqueue() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = JobsRepo::new(pool.clone());
    let source_id = Uuid::new_v4();

    let first = repo
        .enqueue(translation_job(org_id(), source_id, "title", "en", 5, 3))
        .await
        .unwrap();
    let EnqueueOutcome::Created(first_id) = first else {
        panic!("expected created");
    };

    assert!(repo.cancel(first_id).await.unwrap());

    let second = repo
        .enqueue(translation_job(org_id(), source_id, "title", "en", 5, 3))
        .await
        .unwrap();
    assert!(matches!(second, EnqueueOutcome::Created(_)));
    assert_eq!(job_count(&pool).await, 2);
}

#[tokio::test]
#[serial]
async fn validation_failures_never_reach_the_table() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = JobsRepo::new(pool.clone());

    let mut empty_text = translation_job(org_id(), Uuid::new_v4(), "title", "en", 5, 3);
    empty_text.source_text = "   ".to_string();
    assert!(matches!(
        repo.enqueue(empty_text).await,
        Err(PipelineError::Validation(_))
    ));

    let mut bad_priority = translation_job(org_id(), Uuid::new_v4(), "title", "en", 11, 3);
    bad_priority.priority = 11;
    assert!(matches!(
        repo.enqueue(bad_priority).await,
        Err(PipelineError::Validation(_))
    ));

    let mut no_target = translation_job(org_id(), Uuid::new_v4(), "title", "en", 5, 3);
    no_target.target_lang = None;
    assert!(matches!(
        repo.enqueue(no_target).await,
        Err(PipelineError::Validation(_))
    ));

    let mut nil_org = translation_job(Uuid::nil(), Uuid::new_v4(), "title", "en", 5, 3);
    nil_org.organization_id = Uuid::nil();
    assert!(matches!(
        repo.enqueue(nil_org).await,
        Err(PipelineError::Validation(_))
    ));

    assert_eq!(job_count(&pool).await, 0);
}
