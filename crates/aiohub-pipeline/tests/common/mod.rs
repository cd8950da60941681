use aiohub_pipeline::jobs::{JobKind, JobProvider, NewJob, ProviderError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Mutex;
use uuid::Uuid;

/// Connects, migrates and truncates, or returns None when
/// TEST_DATABASE_URL is not configured so the suite can skip cleanly.
pub async fn try_setup_db() -> Option<PgPool> {
    let _ = dotenvy::dotenv();

    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(u) if !u.trim().is_empty() => u,
        _ => {
            eprintln!("TEST_DATABASE_URL not set; skipping database-backed test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("failed to connect to TEST_DATABASE_URL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations failed");

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
    .execute(&pool)
    .await
    .expect("truncate failed");

    Some(pool)
}

#[allow(dead_code)]
pub fn org_id() -> Uuid {
    Uuid::parse_str("a7c3b8f2-5f31-4f0e-9d27-3f9f4b6a1c55").unwrap()
}

#[allow(dead_code)]
pub fn translation_job(
    organization_id: Uuid,
    source_id: Uuid,
    source_field: &str,
    target_lang: &str,
    priority: i32,
    max_retries: i32,
) -> NewJob {
    NewJob {
        organization_id,
        kind: JobKind::Translation,
        source_table: "posts".to_string(),
        source_id,
        source_field: source_field.to_string(),
        source_lang: Some("ja".to_string()),
        target_lang: Some(target_lang.to_string()),
        source_text: format!("text of {source_field}"),
        priority,
        max_retries,
        scheduled_at: Utc::now(),
    }
}

/// Succeeds on everything and remembers the order of translate calls.
#[allow(dead_code)]
pub struct EchoProvider {
    pub calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl EchoProvider {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl JobProvider for EchoProvider {
    async fn translate(
        &self,
        source_text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(source_text.to_string());
        Ok(format!("[{source_lang}->{target_lang}] {source_text}"))
    }

    async fn embed(&self, source_text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.lock().unwrap().push(source_text.to_string());
        Ok(vec![0.25; 4])
    }
}

/// Always fails with a fixed error code.
#[allow(dead_code)]
pub struct FailProvider {
    pub code: &'static str,
}

#[async_trait]
impl JobProvider for FailProvider {
    async fn translate(
        &self,
        _source_text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::new(self.code, "simulated provider failure"))
    }

    async fn embed(&self, _source_text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::new(self.code, "simulated provider failure"))
    }
}
