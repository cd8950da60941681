use crate::content::ContentTable;
use crate::error::{PipelineError, Result};
use crate::jobs::idempotency::idempotency_key;
use crate::jobs::model::{Job, JobKind, NewJob};
use crate::jobs::provider::JobOutput;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new job row was inserted.
    Created(Uuid),
    /// A job with the same idempotency key is already pending or in
    /// progress; nothing was inserted.
    Deduplicated,
}

#[derive(Clone)]
pub struct JobsRepo {
    pool: PgPool,
}

impl JobsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ----------------------------
    // Enqueue
    // ----------------------------

    /// Validate and durably schedule one unit of work. Deduplication is a
    /// single atomic insert against the partial unique index over active
    /// idempotency keys; a conflicting outstanding job makes this a no-op
    /// success. Terminal prior jobs do not block a new row.
    pub async fn enqueue(&self, job: NewJob) -> Result<EnqueueOutcome> {
        validate(&job)?;

        let key = idempotency_key(
            job.kind,
            job.organization_id,
            &job.source_table,
            job.source_id,
            &job.source_field,
            job.target_lang.as_deref(),
        );

        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO pipeline_jobs (
                organization_id, kind,
                source_table, source_id, source_field,
                source_lang, target_lang, source_text,
                status, idempotency_key,
                retry_count, max_retries, priority, scheduled_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, 0, $10, $11, $12)
            ON CONFLICT (idempotency_key)
                WHERE status IN ('pending', 'in_progress')
                DO NOTHING
            RETURNING id
            "#,
        )
        .bind(job.organization_id)
        .bind(job.kind.as_str())
        .bind(&job.source_table)
        .bind(job.source_id)
        .bind(&job.source_field)
        .bind(&job.source_lang)
        .bind(&job.target_lang)
        .bind(&job.source_text)
        .bind(&key)
        .bind(job.max_retries)
        .bind(job.priority)
        .bind(job.scheduled_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match inserted {
            Some(id) => EnqueueOutcome::Created(id),
            None => EnqueueOutcome::Deduplicated,
        })
    }

    // ----------------------------
    // Claiming
    // ----------------------------

    /// Atomically claim a bounded batch of eligible jobs. Concurrent
    /// drain invocations skip each other's rows via SKIP LOCKED, so a
    /// job is only ever claimed once. The returned batch is re-sorted so
    /// callers process it in drain order.
    pub async fn claim_batch(&self, batch_size: i64) -> Result<Vec<Job>> {
        let mut jobs = sqlx::query_as::<_, Job>(
            r#"
            WITH candidates AS (
                SELECT id
                FROM pipeline_jobs
                WHERE status = 'pending'
                  AND scheduled_at <= now()
                ORDER BY priority DESC, scheduled_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT $1
            )
            UPDATE pipeline_jobs j
            SET status = 'in_progress',
                started_at = now(),
                updated_at = now()
            FROM candidates c
            WHERE j.id = c.id
            RETURNING j.*
            "#,
        )
        .bind(batch_size.clamp(1, 500))
        .fetch_all(&self.pool)
        .await?;

        // UPDATE ... RETURNING does not preserve the candidate ordering.
        jobs.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.scheduled_at.cmp(&b.scheduled_at))
        });

        Ok(jobs)
    }

    // ----------------------------
    // State transitions
    // ----------------------------

    /// Terminal success: write the output and stamp `completed_at`.
    /// Guarded on `in_progress` so only the claiming drain cycle can
    /// finalize the row.
    pub async fn mark_completed(&self, job_id: Uuid, output: &JobOutput) -> Result<()> {
        let (translated_text, embedding) = match output {
            JobOutput::Translated(text) => (Some(text.clone()), None),
            JobOutput::Embedded(vector) => (None, Some(serde_json::json!(vector))),
        };

        sqlx::query(
            r#"
            UPDATE pipeline_jobs
            SET status = 'completed',
                translated_text = COALESCE($2, translated_text),
                embedding = COALESCE($3, embedding),
                error_message = NULL,
                completed_at = now(),
                updated_at = now()
            WHERE id = $1
              AND status = 'in_progress'
            "#,
        )
        .bind(job_id)
        .bind(translated_text)
        .bind(embedding)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Failure with retry budget remaining: increment the retry counter,
    /// record the failure reason and requeue with a delayed schedule.
    pub async fn requeue_for_retry(
        &self,
        job_id: Uuid,
        next_scheduled_at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pipeline_jobs
            SET status = 'pending',
                retry_count = retry_count + 1,
                error_message = $3,
                scheduled_at = $2,
                started_at = NULL,
                updated_at = now()
            WHERE id = $1
              AND status = 'in_progress'
            "#,
        )
        .bind(job_id)
        .bind(next_scheduled_at)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Terminal failure: budget exhausted or non-retryable error.
    pub async fn mark_failed(&self, job_id: Uuid, error_message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pipeline_jobs
            SET status = 'failed',
                error_message = $2,
                completed_at = now(),
                updated_at = now()
            WHERE id = $1
              AND status = 'in_progress'
            "#,
        )
        .bind(job_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Explicit cancellation of a non-terminal job. Cooperative only: an
    /// in-flight execution is not interrupted, its terminal write will
    /// find the row no longer `in_progress` and leave it cancelled.
    pub async fn cancel(&self, job_id: Uuid) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE pipeline_jobs
            SET status = 'cancelled',
                completed_at = now(),
                updated_at = now()
            WHERE id = $1
              AND status IN ('pending', 'in_progress')
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() > 0)
    }

    /// Requeue claims abandoned by a drain invocation that died
    /// mid-cycle. Does not touch the retry budget: the job never got a
    /// terminal verdict.
    pub async fn release_stale_claims(&self, older_than_secs: i64) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE pipeline_jobs
            SET status = 'pending',
                started_at = NULL,
                updated_at = now()
            WHERE status = 'in_progress'
              AND started_at IS NOT NULL
              AND started_at < now() - ($1::bigint * interval '1 second')
            "#,
        )
        .bind(older_than_secs)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }

    // ----------------------------
    // Reads
    // ----------------------------

    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM pipeline_jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Newest-first listing for the admin dashboard.
    /// limit is clamped to [1, 500].
    pub async fn list_jobs(
        &self,
        organization_id: Option<Uuid>,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Job>> {
        let limit = limit.clamp(1, 500);

        let rows = match (organization_id, status) {
            (Some(org), Some(st)) => {
                sqlx::query_as::<_, Job>(
                    r#"
                    SELECT *
                    FROM pipeline_jobs
                    WHERE organization_id = $1 AND status = $2
                    ORDER BY created_at DESC, id DESC
                    LIMIT $3
                    "#,
                )
                .bind(org)
                .bind(st)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            (Some(org), None) => {
                sqlx::query_as::<_, Job>(
                    r#"
                    SELECT *
                    FROM pipeline_jobs
                    WHERE organization_id = $1
                    ORDER BY created_at DESC, id DESC
                    LIMIT $2
                    "#,
                )
                .bind(org)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some(st)) => {
                sqlx::query_as::<_, Job>(
                    r#"
                    SELECT *
                    FROM pipeline_jobs
                    WHERE status = $1
                    ORDER BY created_at DESC, id DESC
                    LIMIT $2
                    "#,
                )
                .bind(st)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            (None, None) => {
                sqlx::query_as::<_, Job>(
                    r#"
                    SELECT *
                    FROM pipeline_jobs
                    ORDER BY created_at DESC, id DESC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }
}

fn validate(job: &NewJob) -> Result<()> {
    if job.organization_id.is_nil() {
        return Err(PipelineError::Validation(
            "organization_id is required".into(),
        ));
    }
    if job.source_id.is_nil() {
        return Err(PipelineError::Validation("source_id is required".into()));
    }
    if ContentTable::parse(&job.source_table).is_none() {
        return Err(PipelineError::Validation(format!(
            "unknown source_table: {}",
            job.source_table
        )));
    }
    if job.source_field.trim().is_empty() {
        return Err(PipelineError::Validation("source_field is required".into()));
    }
    if job.source_text.trim().is_empty() {
        return Err(PipelineError::Validation("source_text is empty".into()));
    }
    if !(1..=10).contains(&job.priority) {
        return Err(PipelineError::Validation(format!(
            "priority must be within 1-10, got {}",
            job.priority
        )));
    }
    if job.max_retries < 0 {
        return Err(PipelineError::Validation("max_retries must be >= 0".into()));
    }
    if job.kind == JobKind::Translation {
        if job.target_lang.as_deref().unwrap_or("").trim().is_empty() {
            return Err(PipelineError::Validation(
                "target_lang is required for translation jobs".into(),
            ));
        }
        if job.source_lang.as_deref().unwrap_or("").trim().is_empty() {
            return Err(PipelineError::Validation(
                "source_lang is required for translation jobs".into(),
            ));
        }
    }
    Ok(())
}
