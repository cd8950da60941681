use crate::content::{ContentRepo, ContentTable};
use crate::error::{PipelineError, Result};
use crate::jobs::model::{JobKind, NewJob};
use crate::jobs::repo::{EnqueueOutcome, JobsRepo};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BulkEnqueueRequest {
    pub organization_id: Uuid,
    pub content_types: Vec<ContentTable>,
    pub source_lang: String,
    pub target_languages: Vec<String>,
    pub priority: i32,
    pub max_retries: i32,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct BulkEnqueueReport {
    /// Individual enqueue calls attempted (rows x fields x languages).
    pub requested: usize,
    pub enqueued: usize,
    pub deduplicated: usize,
    pub failed: usize,
}

/// Fans one admin action out into per-(row, field, language) enqueues.
/// Volume can be large, so one bad item never aborts the batch: each
/// failure is logged, counted and skipped.
#[derive(Clone)]
pub struct BulkEnqueuer {
    content: ContentRepo,
    jobs: JobsRepo,
}

impl BulkEnqueuer {
    pub fn new(content: ContentRepo, jobs: JobsRepo) -> Self {
        Self { content, jobs }
    }

    pub async fn run(&self, req: &BulkEnqueueRequest) -> Result<BulkEnqueueReport> {
        if req.organization_id.is_nil() {
            return Err(PipelineError::Validation(
                "organization_id is required".into(),
            ));
        }
        if req.content_types.is_empty() {
            return Err(PipelineError::Validation(
                "at least one content type is required".into(),
            ));
        }
        if req.target_languages.is_empty() {
            return Err(PipelineError::Validation(
                "at least one target language is required".into(),
            ));
        }

        let mut report = BulkEnqueueReport::default();

        for table in &req.content_types {
            let rows = self.content.list_rows(req.organization_id, *table).await?;

            for row in rows {
                for (field, text) in &row.fields {
                    for lang in &req.target_languages {
                        report.requested += 1;

                        let new_job = NewJob {
                            organization_id: req.organization_id,
                            kind: JobKind::Translation,
                            source_table: table.as_str().to_string(),
                            source_id: row.id,
                            source_field: field.to_string(),
                            source_lang: Some(req.source_lang.clone()),
                            target_lang: Some(lang.clone()),
                            source_text: text.clone(),
                            priority: req.priority,
                            max_retries: req.max_retries,
                            scheduled_at: Utc::now(),
                        };

                        match self.jobs.enqueue(new_job).await {
                            Ok(EnqueueOutcome::Created(_)) => report.enqueued += 1,
                            Ok(EnqueueOutcome::Deduplicated) => report.deduplicated += 1,
                            Err(e) => {
                                report.failed += 1;
                                tracing::warn!(
                                    table = table.as_str(),
                                    source_id = %row.id,
                                    field = %field,
                                    lang = %lang,
                                    error = %e,
                                    "bulk enqueue item skipped"
                                );
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(
            requested = report.requested,
            enqueued = report.enqueued,
            deduplicated = report.deduplicated,
            failed = report.failed,
            "bulk enqueue finished"
        );

        Ok(report)
    }
}
