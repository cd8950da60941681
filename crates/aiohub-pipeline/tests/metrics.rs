mod common;

use aiohub_pipeline::jobs::{EnqueueOutcome, JobsRepo, MetricsRepo};
use common::{org_id, translation_job, try_setup_db};
use serial_test::serial;
use uuid::Uuid;

async fn enqueue_one(repo: &JobsRepo, target_lang: &str) -> Uuid {
    match repo
        .enqueue(translation_job(org_id(), Uuid::new_v4(), "title", target_lang, 5, 3))
        .await
        .unwrap()
    {
        EnqueueOutcome::Created(id) => id,
        EnqueueOutcome::Deduplicated => panic!("unexpected dedup in test setup"),
    }
}

async fn force_completed(pool: &sqlx::PgPool, id: Uuid, with_started_at: bool) {
    if with_started_at {
        sqlx::query(
            r#"
            UPDATE pipeline_jobs
            SET status = 'completed',
                started_at = now() - interval '2 seconds',
                completed_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    } else {
        sqlx::query(
            r#"
            UPDATE pipeline_jobs
            SET status = 'completed',
                started_at = NULL,
                completed_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    }
}

#[tokio::test]
#[serial]
async fn empty_job_set_yields_zeroed_metrics() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let metrics = MetricsRepo::new(pool.clone());

    let snapshot = metrics.snapshot(None).await.unwrap();

    assert_eq!(snapshot.total, 0);
    assert_eq!(snapshot.pending, 0);
    assert_eq!(snapshot.completed, 0);
    assert_eq!(snapshot.success_rate, 0.0);
    assert_eq!(snapshot.mean_processing_ms, 0.0);
    assert!(snapshot.by_target_lang.is_empty());
    assert!(snapshot.by_source_table.is_empty());
}

#[tokio::test]
#[serial]
async fn counts_rates_and_breakdowns() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let jobs = JobsRepo::new(pool.clone());
    let metrics = MetricsRepo::new(pool.clone());

    let done = enqueue_one(&jobs, "en").await;
    let _pending = enqueue_one(&jobs, "en").await;
    let failed = enqueue_one(&jobs, "zh").await;
    let cancelled = enqueue_one(&jobs, "zh").await;

    force_completed(&pool, done, true).await;
    sqlx::query("UPDATE pipeline_jobs SET status = 'failed', completed_at = now() WHERE id = $1")
        .bind(failed)
        .execute(&pool)
        .await
        .unwrap();
    jobs.cancel(cancelled).await.unwrap();

    let snapshot = metrics.snapshot(None).await.unwrap();

    assert_eq!(snapshot.total, 4);
    assert_eq!(snapshot.pending, 1);
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.cancelled, 1);
    assert!((snapshot.success_rate - 0.25).abs() < f64::EPSILON);

    let langs: Vec<(String, i64)> = snapshot
        .by_target_lang
        .iter()
        .map(|b| (b.key.clone(), b.count))
        .collect();
    assert!(langs.contains(&("en".to_string(), 2)));
    assert!(langs.contains(&("zh".to_string(), 2)));

    assert_eq!(snapshot.by_source_table.len(), 1);
    assert_eq!(snapshot.by_source_table[0].key, "posts");
    assert_eq!(snapshot.by_source_table[0].count, 4);
}

#[tokio::test]
#[serial]
async fn completed_without_started_at_is_excluded_from_duration_mean() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let jobs = JobsRepo::new(pool.clone());
    let metrics = MetricsRepo::new(pool.clone());

    let timed = enqueue_one(&jobs, "en").await;
    let untimed = enqueue_one(&jobs, "zh").await;

    force_completed(&pool, timed, true).await;
    force_completed(&pool, untimed, false).await;

    let snapshot = metrics.snapshot(None).await.unwrap();

    // Both count as completed, but only the timed one feeds the mean.
    assert_eq!(snapshot.completed, 2);
    assert!(
        (snapshot.mean_processing_ms - 2000.0).abs() < 100.0,
        "mean {} should reflect only the 2s job",
        snapshot.mean_processing_ms
    );
}

#[tokio::test]
#[serial]
async fn snapshot_scopes_to_one_organization() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let jobs = JobsRepo::new(pool.clone());
    let metrics = MetricsRepo::new(pool.clone());

    enqueue_one(&jobs, "en").await;

    let other_org = Uuid::new_v4();
    jobs.enqueue(translation_job(other_org, Uuid::new_v4(), "title", "en", 5, 3))
        .await
        .unwrap();

    let scoped = metrics.snapshot(Some(org_id())).await.unwrap();
    assert_eq!(scoped.total, 1);

    let global = metrics.snapshot(None).await.unwrap();
    assert_eq!(global.total, 2);
}
