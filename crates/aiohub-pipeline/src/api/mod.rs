use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::models::JobListItem;
use crate::content::ContentTable;
use crate::error::PipelineError;
use crate::jobs::bulk::BulkEnqueueRequest;
use crate::jobs::{
    BulkEnqueueReport, BulkEnqueuer, DrainReport, DrainService, EnqueueOutcome, JobKind, JobsRepo,
    MetricsRepo, NewJob, PipelineMetrics,
};
use crate::sessions::{SaveResult, SessionSnapshot, SessionsRepo};

pub mod models;

#[derive(Clone)]
pub struct ApiState {
    pub jobs: JobsRepo,
    pub metrics: MetricsRepo,
    pub sessions: SessionsRepo,
    pub bulk: BulkEnqueuer,
    pub drain: DrainService,
    pub default_max_retries: i32,
    pub stale_claim_secs: i64,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        // Jobs
        .route("/jobs", get(list_jobs).post(enqueue_job))
        .route("/jobs/bulk", post(bulk_enqueue))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/cancel", post(cancel_job))
        // Pipeline operations
        .route("/drain", post(run_drain))
        .route("/maintenance/release-stale", post(release_stale))
        // Metrics
        .route("/metrics", get(metrics))
        .route("/metrics/prom", get(metrics_prom))
        // Interview sessions
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/answers", post(save_answers))
        .route("/sessions/:id/complete", post(complete_session))
        // Health
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(e: PipelineError) -> Response {
    let (status, message) = match &e {
        PipelineError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        PipelineError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
        PipelineError::Storage(err) => {
            tracing::error!(error = %err, "storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    };

    (status, Json(ErrorBody { error: message })).into_response()
}

// ----------------------------
// Jobs
// ----------------------------

#[derive(Debug, Deserialize)]
pub struct EnqueueJobRequest {
    pub organization_id: Uuid,
    pub kind: Option<String>,
    pub source_table: String,
    pub source_id: Uuid,
    pub source_field: String,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub source_text: String,
    pub priority: Option<i32>,
    pub max_retries: Option<i32>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EnqueueJobResponse {
    pub job_id: Option<Uuid>,
    pub deduplicated: bool,
}

pub async fn enqueue_job(
    State(state): State<ApiState>,
    Json(body): Json<EnqueueJobRequest>,
) -> Response {
    let kind = match body.kind.as_deref() {
        None => JobKind::Translation,
        Some(raw) => match JobKind::parse(raw) {
            Some(kind) => kind,
            None => {
                return error_response(PipelineError::Validation(format!(
                    "unknown job kind: {raw}"
                )))
            }
        },
    };

    let outcome = state
        .jobs
        .enqueue(NewJob {
            organization_id: body.organization_id,
            kind,
            source_table: body.source_table,
            source_id: body.source_id,
            source_field: body.source_field,
            source_lang: body.source_lang,
            target_lang: body.target_lang,
            source_text: body.source_text,
            priority: body.priority.unwrap_or(5),
            max_retries: body.max_retries.unwrap_or(state.default_max_retries),
            scheduled_at: body.scheduled_at.unwrap_or_else(Utc::now),
        })
        .await;

    match outcome {
        Ok(EnqueueOutcome::Created(id)) => (
            StatusCode::CREATED,
            Json(EnqueueJobResponse {
                job_id: Some(id),
                deduplicated: false,
            }),
        )
            .into_response(),
        Ok(EnqueueOutcome::Deduplicated) => (
            StatusCode::OK,
            Json(EnqueueJobResponse {
                job_id: None,
                deduplicated: true,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkEnqueueBody {
    pub organization_id: Uuid,
    pub content_types: Vec<String>,
    pub source_lang: String,
    pub target_languages: Vec<String>,
    pub priority: Option<i32>,
    pub max_retries: Option<i32>,
}

pub async fn bulk_enqueue(
    State(state): State<ApiState>,
    Json(body): Json<BulkEnqueueBody>,
) -> Response {
    let mut content_types = Vec::with_capacity(body.content_types.len());
    for raw in &body.content_types {
        match ContentTable::parse(raw) {
            Some(table) => content_types.push(table),
            None => {
                return error_response(PipelineError::Validation(format!(
                    "unknown content type: {raw}"
                )))
            }
        }
    }

    let req = BulkEnqueueRequest {
        organization_id: body.organization_id,
        content_types,
        source_lang: body.source_lang,
        target_languages: body.target_languages,
        priority: body.priority.unwrap_or(5),
        max_retries: body.max_retries.unwrap_or(state.default_max_retries),
    };

    match state.bulk.run(&req).await {
        Ok(report) => (StatusCode::OK, Json::<BulkEnqueueReport>(report)).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub organization_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub items: Vec<JobListItem>,
}

pub async fn list_jobs(
    State(state): State<ApiState>,
    Query(q): Query<ListJobsQuery>,
) -> Response {
    match state
        .jobs
        .list_jobs(q.organization_id, q.status.as_deref(), q.limit.unwrap_or(100))
        .await
    {
        Ok(jobs) => {
            let items = jobs.iter().map(JobListItem::from).collect();
            (StatusCode::OK, Json(ListJobsResponse { items })).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn get_job(Path(id): Path<Uuid>, State(state): State<ApiState>) -> Response {
    match state.jobs.get_job(id).await {
        Ok(Some(job)) => (StatusCode::OK, Json(job_detail(&job))).into_response(),
        Ok(None) => error_response(PipelineError::NotFound),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub item: JobListItem,
    pub source_lang: Option<String>,
    pub source_text: String,
    pub translated_text: Option<String>,
    pub embedding: Option<Value>,
    pub idempotency_key: String,
}

fn job_detail(job: &crate::jobs::Job) -> JobDetail {
    JobDetail {
        item: JobListItem::from(job),
        source_lang: job.source_lang.clone(),
        source_text: job.source_text.clone(),
        translated_text: job.translated_text.clone(),
        embedding: job.embedding.clone(),
        idempotency_key: job.idempotency_key.clone(),
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

pub async fn cancel_job(Path(id): Path<Uuid>, State(state): State<ApiState>) -> Response {
    match state.jobs.cancel(id).await {
        Ok(true) => (StatusCode::OK, Json(CancelResponse { cancelled: true })).into_response(),
        // Already terminal (or unknown): not cancellable.
        Ok(false) => (
            StatusCode::CONFLICT,
            Json(ErrorBody {
                error: "job is not cancellable".into(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

// ----------------------------
// Pipeline operations
// ----------------------------

pub async fn run_drain(State(state): State<ApiState>) -> Response {
    match state.drain.drain_cycle().await {
        Ok(report) => (StatusCode::OK, Json::<DrainReport>(report)).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Serialize)]
pub struct ReleaseStaleResponse {
    pub released: u64,
}

pub async fn release_stale(State(state): State<ApiState>) -> Response {
    match state.jobs.release_stale_claims(state.stale_claim_secs).await {
        Ok(released) => (StatusCode::OK, Json(ReleaseStaleResponse { released })).into_response(),
        Err(e) => error_response(e),
    }
}

// ----------------------------
// Metrics
// ----------------------------

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub now_utc: DateTime<Utc>,
    pub pipeline: PipelineMetrics,
    pub drain_totals: crate::jobs::collector::DrainTotals,
}

pub async fn metrics(
    State(state): State<ApiState>,
    Query(q): Query<MetricsQuery>,
) -> Response {
    match state.metrics.snapshot(q.organization_id).await {
        Ok(pipeline) => (
            StatusCode::OK,
            Json(MetricsResponse {
                now_utc: Utc::now(),
                pipeline,
                drain_totals: state.drain.collector().totals(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn metrics_prom(State(state): State<ApiState>) -> Response {
    // Minimal Prometheus text format (no extra crate needed).
    match state.metrics.snapshot(None).await {
        Ok(m) => {
            let body = format!(
                concat!(
                    "# HELP aiohub_jobs_pending Number of pending jobs\n",
                    "# TYPE aiohub_jobs_pending gauge\n",
                    "aiohub_jobs_pending {}\n",
                    "# HELP aiohub_jobs_in_progress Number of claimed jobs\n",
                    "# TYPE aiohub_jobs_in_progress gauge\n",
                    "aiohub_jobs_in_progress {}\n",
                    "# HELP aiohub_jobs_completed Jobs completed\n",
                    "# TYPE aiohub_jobs_completed gauge\n",
                    "aiohub_jobs_completed {}\n",
                    "# HELP aiohub_jobs_failed Jobs terminally failed\n",
                    "# TYPE aiohub_jobs_failed gauge\n",
                    "aiohub_jobs_failed {}\n",
                    "# HELP aiohub_jobs_success_rate Completed over total\n",
                    "# TYPE aiohub_jobs_success_rate gauge\n",
                    "aiohub_jobs_success_rate {}\n"
                ),
                m.pending, m.in_progress, m.completed, m.failed, m.success_rate
            );

            (StatusCode::OK, body).into_response()
        }
        Err(e) => error_response(e),
    }
}

// ----------------------------
// Interview sessions
// ----------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub organization_id: Uuid,
    pub user_id: Uuid,
}

pub async fn create_session(
    State(state): State<ApiState>,
    Json(body): Json<CreateSessionRequest>,
) -> Response {
    match state
        .sessions
        .create(body.organization_id, body.user_id)
        .await
    {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_session(Path(id): Path<Uuid>, State(state): State<ApiState>) -> Response {
    match state.sessions.get(id).await {
        Ok(Some(session)) => (StatusCode::OK, Json(session)).into_response(),
        Ok(None) => error_response(PipelineError::NotFound),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnswersRequest {
    pub answers: Value,
    pub client_version: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnswersResponse {
    pub ok: bool,
    pub new_version: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SaveConflictResponse {
    pub conflict: bool,
    pub latest: SessionSnapshot,
}

pub async fn save_answers(
    Path(id): Path<Uuid>,
    State(state): State<ApiState>,
    Json(body): Json<SaveAnswersRequest>,
) -> Response {
    match state
        .sessions
        .save_answers(id, &body.answers, body.client_version)
        .await
    {
        Ok(SaveResult::Saved {
            new_version,
            updated_at,
        }) => (
            StatusCode::OK,
            Json(SaveAnswersResponse {
                ok: true,
                new_version,
                updated_at,
            }),
        )
            .into_response(),
        Ok(SaveResult::Conflict { latest }) => (
            StatusCode::CONFLICT,
            Json(SaveConflictResponse {
                conflict: true,
                latest,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Serialize)]
pub struct SessionOpResponse {
    pub ok: bool,
}

pub async fn complete_session(Path(id): Path<Uuid>, State(state): State<ApiState>) -> Response {
    match state.sessions.mark_completed(id).await {
        Ok(true) => (StatusCode::OK, Json(SessionOpResponse { ok: true })).into_response(),
        Ok(false) => error_response(PipelineError::NotFound),
        Err(e) => error_response(e),
    }
}

pub async fn delete_session(Path(id): Path<Uuid>, State(state): State<ApiState>) -> Response {
    match state.sessions.soft_delete(id).await {
        Ok(true) => (StatusCode::OK, Json(SessionOpResponse { ok: true })).into_response(),
        Ok(false) => error_response(PipelineError::NotFound),
        Err(e) => error_response(e),
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
