use std::collections::BTreeMap;

use async_trait::async_trait;
use lora_model::{Task, TaskId, TaskPage, TaskQuery, UploadFile};

use crate::error::ApiError;

/// A training job as received from a client, before validation.
#[derive(Debug, Clone, Default)]
pub struct JobSubmission {
    pub model: String,
    pub job_name: String,
    pub files: Vec<UploadFile>,
    /// Advanced-setting overrides exactly as the client sent them.
    pub overrides: BTreeMap<String, String>,
}

/// Backend behind the HTTP surface.
///
/// `SubmitterAdapter` is the stock implementation; custom handlers can wrap
/// it to add auth or rate limiting.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Validate, upload and record a training job.
    async fn submit_job(&self, job: JobSubmission) -> Result<Task, ApiError>;

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, ApiError>;

    async fn query_tasks(&self, query: TaskQuery) -> Result<TaskPage<Task>, ApiError>;
}
