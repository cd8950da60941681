use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InterviewSession {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub answers: Value,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Authoritative state handed back on a version conflict, enough for the
/// caller to re-merge and retry.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub answers: Value,
}

#[derive(Debug, Clone)]
pub enum SaveResult {
    Saved {
        new_version: i64,
        updated_at: DateTime<Utc>,
    },
    /// The caller's version is stale. Nothing was written.
    Conflict { latest: SessionSnapshot },
}

#[derive(Clone)]
pub struct SessionsRepo {
    pool: PgPool,
}

impl SessionsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, organization_id: Uuid, user_id: Uuid) -> Result<InterviewSession> {
        if organization_id.is_nil() {
            return Err(PipelineError::Validation(
                "organization_id is required".into(),
            ));
        }
        if user_id.is_nil() {
            return Err(PipelineError::Validation("user_id is required".into()));
        }

        let session = sqlx::query_as::<_, InterviewSession>(
            r#"
            INSERT INTO interview_sessions (organization_id, user_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    /// Soft-deleted sessions are invisible to reads.
    pub async fn get(&self, session_id: Uuid) -> Result<Option<InterviewSession>> {
        let session = sqlx::query_as::<_, InterviewSession>(
            r#"
            SELECT *
            FROM interview_sessions
            WHERE id = $1
              AND deleted_at IS NULL
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Merge answers into the session document, guarded by the caller's
    /// last-known version. The check-and-increment is one conditional
    /// UPDATE, so two concurrent savers can never both win the same
    /// version. The losing caller gets the live row back to re-merge.
    ///
    /// A first save also moves a draft session into `in_progress`.
    pub async fn save_answers(
        &self,
        session_id: Uuid,
        answers: &Value,
        client_version: i64,
    ) -> Result<SaveResult> {
        if !answers.is_object() {
            return Err(PipelineError::Validation(
                "answers must be a JSON object".into(),
            ));
        }

        let committed: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            UPDATE interview_sessions
            SET answers = answers || $2,
                version = version + 1,
                status = CASE WHEN status = 'draft' THEN 'in_progress' ELSE status END,
                updated_at = now()
            WHERE id = $1
              AND deleted_at IS NULL
              AND version = $3
            RETURNING version, updated_at
            "#,
        )
        .bind(session_id)
        .bind(answers)
        .bind(client_version)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((new_version, updated_at)) = committed {
            return Ok(SaveResult::Saved {
                new_version,
                updated_at,
            });
        }

        // The guard failed: either the row is gone/soft-deleted, or the
        // version moved. Distinguish the two for the caller.
        let latest = sqlx::query_as::<_, SessionSnapshot>(
            r#"
            SELECT id, version, updated_at, answers
            FROM interview_sessions
            WHERE id = $1
              AND deleted_at IS NULL
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        match latest {
            Some(latest) => Ok(SaveResult::Conflict { latest }),
            None => Err(PipelineError::NotFound),
        }
    }

    pub async fn mark_completed(&self, session_id: Uuid) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET status = 'completed',
                updated_at = now()
            WHERE id = $1
              AND deleted_at IS NULL
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() > 0)
    }

    pub async fn soft_delete(&self, session_id: Uuid) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET deleted_at = now(),
                updated_at = now()
            WHERE id = $1
              AND deleted_at IS NULL
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() > 0)
    }
}
