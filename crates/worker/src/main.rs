use aiohub_pipeline::api;
use aiohub_pipeline::config::Config;
use aiohub_pipeline::content::ContentRepo;
use aiohub_pipeline::db;
use aiohub_pipeline::jobs::retry::RetryConfig;
use aiohub_pipeline::jobs::{BulkEnqueuer, DrainCollector, DrainService, JobsRepo, MetricsRepo};
use aiohub_pipeline::sessions::SessionsRepo;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod providers;
use providers::DemoProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env()?;

    tracing::info!(
        admin_addr = cfg.admin_addr.as_deref().unwrap_or("disabled"),
        drain_batch_size = cfg.drain_batch_size,
        drain_interval_secs = cfg.drain_interval_secs,
        provider_timeout_secs = cfg.provider_timeout_secs,
        stale_claim_secs = cfg.stale_claim_secs,
        migrate_on_startup = cfg.migrate_on_startup,
        "aiohub pipeline worker starting"
    );

    let pool = db::make_pool(&cfg.database_url).await?;
    if cfg.migrate_on_startup {
        db::run_migrations(&pool).await?;
    }

    let jobs_repo = JobsRepo::new(pool.clone());
    let metrics_repo = MetricsRepo::new(pool.clone());
    let sessions_repo = SessionsRepo::new(pool.clone());
    let content_repo = ContentRepo::new(pool.clone());
    let bulk = BulkEnqueuer::new(content_repo.clone(), jobs_repo.clone());

    let drain = DrainService::new(
        jobs_repo.clone(),
        Arc::new(DemoProvider::new()),
        RetryConfig::default(),
        Duration::from_secs(cfg.provider_timeout_secs),
        cfg.drain_batch_size,
        DrainCollector::new(256),
    );

    // ---- API task ----
    let api_state = api::ApiState {
        jobs: jobs_repo.clone(),
        metrics: metrics_repo.clone(),
        sessions: sessions_repo.clone(),
        bulk: bulk.clone(),
        drain: drain.clone(),
        default_max_retries: cfg.default_max_retries,
        stale_claim_secs: cfg.stale_claim_secs,
    };
    let app = api::router(api_state);
    let api_addr = cfg.admin_addr.clone();

    let api_handle = tokio::spawn(async move {
        if let Some(addr) = api_addr {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("admin api listening on http://{addr}");
            axum::serve(listener, app).await?;
        } else {
            std::future::pending::<()>().await;
        }
        Ok::<(), anyhow::Error>(())
    });

    // ---- Drain timer task ----
    // The serverless original is cron-invoked; here an interval timer
    // plays cron, one bounded batch per tick. Interval 0 disables the
    // timer and leaves draining to POST /drain.
    let drain_for_timer = drain.clone();
    let drain_interval_secs = cfg.drain_interval_secs;

    let drain_handle = tokio::spawn(async move {
        if drain_interval_secs == 0 {
            std::future::pending::<()>().await;
            return Ok::<(), anyhow::Error>(());
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(drain_interval_secs));
        loop {
            ticker.tick().await;
            match drain_for_timer.drain_cycle().await {
                Ok(report) if report.claimed > 0 => {
                    tracing::info!(
                        claimed = report.claimed,
                        completed = report.completed,
                        requeued = report.requeued,
                        failed = report.failed,
                        "timed drain cycle"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "drain cycle failed"),
            }
        }
    });

    // ---- Stale-claim maintenance task ----
    let maintenance_jobs = jobs_repo.clone();
    let stale_claim_secs = cfg.stale_claim_secs;

    let maintenance_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            match maintenance_jobs.release_stale_claims(stale_claim_secs).await {
                Ok(n) if n > 0 => tracing::warn!(released = n, "released stale claims"),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "stale-claim release failed"),
            }
        }
        #[allow(unreachable_code)]
        Ok::<(), anyhow::Error>(())
    });

    tokio::select! {
        res = api_handle => res??,
        res = drain_handle => res??,
        res = maintenance_handle => res??,
    }

    Ok(())
}
