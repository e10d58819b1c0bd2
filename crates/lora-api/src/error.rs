use lora_core::{StoreError, SubmitError};
use lora_model::TaskId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The job-execution service refused the upload.
    #[error("{0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::DuplicateName(_) => ApiError::Conflict(err.to_string()),
            SubmitError::Rejected(_) => ApiError::Upstream(err.to_string()),
            SubmitError::Store(e) => e.into(),
            other => ApiError::InvalidRequest(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::TaskNotFound(id),
            StoreError::Conflict(_) => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(feature = "http")]
impl ApiError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(feature = "http")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
