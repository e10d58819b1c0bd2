use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::Field},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use lora_core::success_message;
use lora_model::{Task, TaskId, TaskQuery, TaskStatus, UploadFile};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::ApiError,
    handler::{ApiHandler, JobSubmission},
};

/// Uploads carry training images; axum's 2 MiB default is far too small.
const DEFAULT_BODY_LIMIT: usize = 256 * 1024 * 1024;

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
    body_limit: usize,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - POST /api/v1/jobs - Submit a training job (multipart)
    /// - GET /api/v1/tasks - List tasks (`status`, `limit`, `offset`)
    /// - GET /api/v1/tasks/{id} - Get one task
    /// - GET /health - Liveness
    pub fn router(self) -> Router {
        Router::new()
            .route("/api/v1/jobs", post(submit_job::<H>))
            .route("/api/v1/tasks", get(list_tasks::<H>))
            .route("/api/v1/tasks/{id}", get(get_task::<H>))
            .route("/health", get(health))
            .layer(DefaultBodyLimit::max(self.body_limit))
            .with_state(self.handler)
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct SubmitJobResponse {
    task_id: TaskId,
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GetTaskResponse {
    task: Task,
}

#[derive(Debug, Deserialize)]
struct ListTasksParams {
    status: Option<String>,
    /// Max items per page (default 100, max 1000)
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ListTasksResponse {
    tasks: Vec<Task>,
    total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/jobs
async fn submit_job<H>(
    State(handler): State<Arc<H>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let job = read_submission(multipart).await?;
    debug!(
        job_name = %job.job_name,
        files = job.files.len(),
        overrides = job.overrides.len(),
        "submitting job"
    );
    let task = handler.submit_job(job).await?;

    let response = SubmitJobResponse {
        task_id: task.id,
        message: success_message(&task),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/tasks/{id}
async fn get_task<H>(
    State(handler): State<Arc<H>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let id = id
        .trim()
        .parse::<u64>()
        .map(TaskId)
        .map_err(|_| ApiError::InvalidRequest(format!("invalid task id: '{id}'")))?;

    let task = handler
        .get_task(id)
        .await?
        .ok_or(ApiError::TaskNotFound(id))?;
    Ok(Json(GetTaskResponse { task }))
}

/// GET /api/v1/tasks
async fn list_tasks<H>(
    State(handler): State<Arc<H>>,
    Query(params): Query<ListTasksParams>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let mut query = TaskQuery::new();

    if let Some(status) = params.status.as_deref().filter(|s| !s.trim().is_empty()) {
        let status = status
            .parse::<TaskStatus>()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        query = query.with_status(status);
    }
    if let Some(limit) = params.limit {
        query = query.with_limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.with_offset(offset);
    }

    let page = handler.query_tasks(query).await?;
    debug!(count = page.items.len(), total = page.total, "tasks listed");

    Ok(Json(ListTasksResponse {
        tasks: page.items,
        total: page.total,
    }))
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ============================================================================
// Multipart
// ============================================================================

async fn read_submission(mut multipart: Multipart) -> Result<JobSubmission, ApiError> {
    let mut job = JobSubmission::default();
    let mut overrides = BTreeMap::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes = read_bytes(field).await?;
            // Browsers send an empty part when no file was picked.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            if name != "files" {
                warn!(field = %name, file = %file_name, "file under unexpected field name");
            }
            job.files.push(UploadFile::new(file_name, bytes));
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        match name.as_str() {
            "model" => job.model = value,
            "job_name" => job.job_name = value,
            "" => warn!("ignoring unnamed form field"),
            _ => {
                overrides.insert(name, value);
            }
        }
    }

    job.overrides = overrides;
    Ok(job)
}

async fn read_bytes(field: Field<'_>) -> Result<Vec<u8>, ApiError> {
    Ok(field.bytes().await.map_err(malformed)?.to_vec())
}

fn malformed(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::InvalidRequest(format!("malformed multipart body: {err}"))
}
