use crate::error::Result;
use crate::jobs::collector::{DrainCollector, DrainSample};
use crate::jobs::model::{Job, JobKind};
use crate::jobs::provider::{JobOutput, JobProvider, ProviderError};
use crate::jobs::repo::JobsRepo;
use crate::jobs::retry::{classify_error, next_delay_seconds, ErrorClass, RetryConfig};
use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

#[derive(Debug, Clone, Serialize, Default)]
pub struct DrainReport {
    pub claimed: usize,
    pub completed: usize,
    pub requeued: usize,
    pub failed: usize,
}

/// Executes one bounded drain cycle per call. There is no resident loop
/// here: invocation comes from outside (a timer, cron, or an admin
/// request), and overlapping invocations are safe because claiming is
/// atomic at the storage layer.
#[derive(Clone)]
pub struct DrainService {
    jobs: JobsRepo,
    provider: Arc<dyn JobProvider>,
    retry_cfg: RetryConfig,
    provider_timeout: Duration,
    batch_size: i64,
    collector: DrainCollector,
}

impl DrainService {
    pub fn new(
        jobs: JobsRepo,
        provider: Arc<dyn JobProvider>,
        retry_cfg: RetryConfig,
        provider_timeout: Duration,
        batch_size: i64,
        collector: DrainCollector,
    ) -> Self {
        Self {
            jobs,
            provider,
            retry_cfg,
            provider_timeout,
            batch_size,
            collector,
        }
    }

    pub fn collector(&self) -> &DrainCollector {
        &self.collector
    }

    /// Claim a batch and run it to terminal or requeued state. Jobs are
    /// executed sequentially in claim order (priority DESC, scheduled_at
    /// ASC), so within one cycle higher-priority work always lands first.
    pub async fn drain_cycle(&self) -> Result<DrainReport> {
        let started = Instant::now();
        let batch = self.jobs.claim_batch(self.batch_size).await?;

        let mut report = DrainReport {
            claimed: batch.len(),
            ..DrainReport::default()
        };

        for job in batch {
            match self.execute(&job).await {
                Ok(output) => {
                    self.jobs.mark_completed(job.id, &output).await?;
                    report.completed += 1;
                }
                Err(err) => {
                    self.settle_failure(&job, err, &mut report).await?;
                }
            }
        }

        self.collector.record(DrainSample {
            at: Utc::now(),
            claimed: report.claimed,
            completed: report.completed,
            requeued: report.requeued,
            failed: report.failed,
            cycle_ms: started.elapsed().as_millis() as u64,
        });

        if report.claimed > 0 {
            tracing::info!(
                claimed = report.claimed,
                completed = report.completed,
                requeued = report.requeued,
                failed = report.failed,
                "drain cycle finished"
            );
        }

        Ok(report)
    }

    /// Run the provider call for one claimed job under the bounded
    /// timeout. A timed-out call counts as a retryable failure.
    async fn execute(&self, job: &Job) -> std::result::Result<JobOutput, ProviderError> {
        let fut = async {
            match JobKind::parse(&job.kind) {
                Some(JobKind::Translation) => {
                    let source_lang = job.source_lang.as_deref().unwrap_or_default();
                    let target_lang = job.target_lang.as_deref().unwrap_or_default();
                    self.provider
                        .translate(&job.source_text, source_lang, target_lang)
                        .await
                        .map(JobOutput::Translated)
                }
                Some(JobKind::Embedding) => self
                    .provider
                    .embed(&job.source_text)
                    .await
                    .map(JobOutput::Embedded),
                None => Err(ProviderError::new(
                    "INVALID_INPUT",
                    format!("unknown job kind: {}", job.kind),
                )),
            }
        };

        match timeout(self.provider_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(ProviderError::new(
                "TIMEOUT",
                format!(
                    "provider call exceeded {}ms",
                    self.provider_timeout.as_millis()
                ),
            )),
        }
    }

    /// Retry-or-fail routing. The retry counter only advances when the
    /// job is actually requeued, so a terminally failed job always shows
    /// retry_count == max_retries (or less, for non-retryable errors).
    async fn settle_failure(
        &self,
        job: &Job,
        err: ProviderError,
        report: &mut DrainReport,
    ) -> Result<()> {
        let class = classify_error(err.code);
        let can_retry = class == ErrorClass::Retryable && job.retry_count < job.max_retries;
        let message = format!("{}: {}", err.code, err.message);

        if can_retry {
            let mut rng = StdRng::from_entropy();
            // retry_count is pre-increment here, so attempt 1 failing
            // computes the attempt-1 delay.
            let delay_secs = next_delay_seconds(job.retry_count + 1, &self.retry_cfg, &mut rng);
            let next_at = Utc::now() + chrono::Duration::seconds(delay_secs);

            self.jobs.requeue_for_retry(job.id, next_at, &message).await?;
            report.requeued += 1;

            tracing::debug!(job_id = %job.id, code = err.code, delay_secs, "job requeued");
        } else {
            self.jobs.mark_failed(job.id, &message).await?;
            report.failed += 1;

            tracing::warn!(
                job_id = %job.id,
                code = err.code,
                retry_count = job.retry_count,
                "job terminally failed"
            );
        }

        Ok(())
    }
}
