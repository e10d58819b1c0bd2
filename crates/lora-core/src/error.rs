use thiserror::Error;

use lora_model::{TaskId, TaskStatus};

/// Failures of the task store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task store unavailable: {0}")]
    Unavailable(String),

    #[error("task name already exists: {0}")]
    Conflict(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("task {id} is {actual}, expected {expected}")]
    StaleStatus {
        id: TaskId,
        expected: TaskStatus,
        actual: TaskStatus,
    },
}

/// The artifact retrieval service could not be told about a finished job.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("artifact fetch service unreachable: {0}")]
    Unreachable(String),

    #[error("artifact fetch request timed out")]
    Timeout,
}

/// Submission failures; the display text is shown to the submitter as is.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("job name must not be empty")]
    EmptyJobName,

    #[error("upload a YAML config document (.yaml or .yml) to start training")]
    MissingConfig,

    #[error("a task named '{0}' already exists")]
    DuplicateName(String),

    #[error("invalid config document: {0}")]
    InvalidConfig(String),

    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidOverride {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("job submission failed: {0}")]
    Rejected(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SubmitError {
    /// `true` for errors caused by the submitted input rather than by a collaborator.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SubmitError::EmptyJobName
                | SubmitError::MissingConfig
                | SubmitError::DuplicateName(_)
                | SubmitError::InvalidConfig(_)
                | SubmitError::InvalidOverride { .. }
        )
    }
}
