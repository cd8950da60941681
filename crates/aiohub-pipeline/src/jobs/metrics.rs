use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct PipelineMetrics {
    pub at: DateTime<Utc>,

    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,

    pub success_rate: f64,
    /// Mean of (completed_at - started_at) over completed jobs carrying
    /// both timestamps; rows missing one are excluded from the mean but
    /// still counted above.
    pub mean_processing_ms: f64,

    pub by_target_lang: Vec<BucketCount>,
    pub by_source_table: Vec<BucketCount>,
}

#[derive(Debug, Serialize)]
pub struct BucketCount {
    pub key: String,
    pub count: i64,
}

#[derive(Clone)]
pub struct MetricsRepo {
    pool: PgPool,
}

impl MetricsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read-only aggregate over the job table, optionally scoped to one
    /// organization. An empty job set yields zeroed metrics.
    pub async fn snapshot(&self, organization_id: Option<Uuid>) -> Result<PipelineMetrics> {
        let (total, pending, in_progress, completed, failed, cancelled, mean_processing_ms): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            f64,
        ) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                COALESCE(
                    AVG(EXTRACT(EPOCH FROM (completed_at - started_at))::float8 * 1000.0)
                        FILTER (WHERE status = 'completed'
                                  AND started_at IS NOT NULL
                                  AND completed_at IS NOT NULL),
                    0.0
                )::float8 AS mean_processing_ms
            FROM pipeline_jobs
            WHERE ($1::uuid IS NULL OR organization_id = $1)
            "#,
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        let success_rate = if total > 0 {
            completed as f64 / total as f64
        } else {
            0.0
        };

        let by_target_lang = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT target_lang, COUNT(*)
            FROM pipeline_jobs
            WHERE target_lang IS NOT NULL
              AND ($1::uuid IS NULL OR organization_id = $1)
            GROUP BY target_lang
            ORDER BY COUNT(*) DESC, target_lang ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(key, count)| BucketCount { key, count })
        .collect();

        let by_source_table = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT source_table, COUNT(*)
            FROM pipeline_jobs
            WHERE ($1::uuid IS NULL OR organization_id = $1)
            GROUP BY source_table
            ORDER BY COUNT(*) DESC, source_table ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(key, count)| BucketCount { key, count })
        .collect();

        Ok(PipelineMetrics {
            at: Utc::now(),
            total,
            pending,
            in_progress,
            completed,
            failed,
            cancelled,
            success_rate,
            mean_processing_ms,
            by_target_lang,
            by_source_table,
        })
    }
}
