use aiohub_pipeline::content::ContentTable;
use aiohub_pipeline::jobs::{JobKind, JobsRepo, MetricsRepo, NewJob};
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "aiopipectl <command>\n\
             Commands:\n\
             - reset\n\
             - seed <n>\n\
             - counts\n\
             - metrics\n\
             - release-stale <secs>\n\
             \n\
             Uses DATABASE_URL or TEST_DATABASE_URL.\n"
        );
        std::process::exit(2);
    }

    let url = env::var("DATABASE_URL")
        .or_else(|_| env::var("TEST_DATABASE_URL"))
        .expect("DATABASE_URL or TEST_DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    match args[1].as_str() {
        "reset" => reset(&pool).await?,
        "seed" => {
            let n: i64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
            seed(&pool, n).await?;
        }
        "counts" => show_counts(&pool).await?,
        "metrics" => {
            let metrics = MetricsRepo::new(pool.clone()).snapshot(None).await?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        "release-stale" => {
            let secs: i64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(900);
            let released = JobsRepo::new(pool.clone())
                .release_stale_claims(secs)
                .await?;
            println!("released {released} stale claims");
        }
        other => {
            eprintln!("Unknown command: {other}");
            std::process::exit(2);
        }
    }

    Ok(())
}

async fn reset(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        TRUNCATE TABLE
            pipeline_jobs,
            interview_sessions,
            posts,
            services,
            faqs,
            case_studies,
            products
        RESTART IDENTITY CASCADE
        "#,
    )
    .execute(pool)
    .await?;

    println!("reset OK");
    Ok(())
}

async fn seed(pool: &PgPool, n: i64) -> anyhow::Result<()> {
    let jobs = JobsRepo::new(pool.clone());
    let org = Uuid::new_v4();

    for i in 0..n {
        let target_lang = if i % 2 == 0 { "en" } else { "zh" };

        let outcome = jobs
            .enqueue(NewJob {
                organization_id: org,
                kind: JobKind::Translation,
                source_table: ContentTable::Posts.as_str().to_string(),
                source_id: Uuid::new_v4(),
                source_field: "title".to_string(),
                source_lang: Some("ja".to_string()),
                target_lang: Some(target_lang.to_string()),
                source_text: format!("seed post title {i}"),
                priority: ((i % 10) + 1) as i32,
                max_retries: 3,
                scheduled_at: Utc::now(),
            })
            .await?;

        println!("+ enqueued seed job {i} ({target_lang}): {outcome:?}");
    }
    Ok(())
}

async fn show_counts(pool: &PgPool) -> anyhow::Result<()> {
    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_jobs WHERE status='pending'")
            .fetch_one(pool)
            .await?;
    let in_progress: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_jobs WHERE status='in_progress'")
            .fetch_one(pool)
            .await?;
    let failed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_jobs WHERE status='failed'")
            .fetch_one(pool)
            .await?;

    println!("jobs: pending={pending} in_progress={in_progress} failed={failed}");
    Ok(())
}
