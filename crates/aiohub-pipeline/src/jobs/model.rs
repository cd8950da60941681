use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// One unit of asynchronous work: translate or embed one field of one
/// content row. `source_text` is a snapshot taken at enqueue time; the
/// source row is never re-read during execution.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub kind: String,

    pub source_table: String,
    pub source_id: Uuid,
    pub source_field: String,

    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub source_text: String,
    pub translated_text: Option<String>,
    pub embedding: Option<Value>,

    pub status: String,
    pub idempotency_key: String,
    pub error_message: Option<String>,

    pub retry_count: i32,
    pub max_retries: i32,
    pub priority: i32,

    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub organization_id: Uuid,
    pub kind: JobKind,
    pub source_table: String,
    pub source_id: Uuid,
    pub source_field: String,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub source_text: String,
    pub priority: i32,
    pub max_retries: i32,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Translation,
    Embedding,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Translation => "translation",
            JobKind::Embedding => "embedding",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "translation" => Some(JobKind::Translation),
            "embedding" => Some(JobKind::Embedding),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}
