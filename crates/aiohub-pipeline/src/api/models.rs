use crate::jobs::Job;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Dashboard-facing job row; omits the (potentially large) text payloads.
#[derive(Debug, Clone, Serialize)]
pub struct JobListItem {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub kind: String,
    pub source_table: String,
    pub source_id: Uuid,
    pub source_field: String,
    pub target_lang: Option<String>,
    pub status: String,

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

impl From<&Job> for JobListItem {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            organization_id: job.organization_id,
            kind: job.kind.clone(),
            source_table: job.source_table.clone(),
            source_id: job.source_id,
            source_field: job.source_field.clone(),
            target_lang: job.target_lang.clone(),
            status: job.status.clone(),
            error_message: job.error_message.clone(),
            retry_count: job.retry_count,
            max_retries: job.max_retries,
            priority: job.priority,
            scheduled_at: job.scheduled_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
