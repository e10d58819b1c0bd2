use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use lora_core::Toolkit;
use lora_model::{RemoteSignal, SubmitOutcome, UploadFile};

use crate::config::{ToolkitConfig, endpoint};
use crate::errors::ToolkitError;

const POLL_PATH: &str = "get_zip/";
const SUBMIT_PATH: &str = "put_jobs/";
const FILES_FIELD: &str = "files";

#[derive(Serialize)]
struct PollRequest<'a> {
    job_name: &'a str,
}

/// Client of the job-execution service.
///
/// Owns the pooled `reqwest::Client` shared by every concurrent call; the
/// pool is released when the last clone of the client is dropped.
#[derive(Clone)]
pub struct ToolkitClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ToolkitClient {
    pub fn new(config: &ToolkitConfig) -> Result<Self, ToolkitError> {
        if config.base_url.trim().is_empty() {
            return Err(ToolkitError::InvalidConfig("toolkit base url is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            timeout: config.request_timeout,
        })
    }

    /// Handle on the shared connection pool.
    pub fn http(&self) -> reqwest::Client {
        self.http.clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(&self, files: Vec<UploadFile>) -> Result<SubmitOutcome, ToolkitError> {
        let mut form = Form::new();
        for file in files {
            let content_type = file.content_type();
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(content_type)?;
            form = form.part(FILES_FIELD, part);
        }

        let response = self
            .http
            .post(endpoint(&self.base_url, SUBMIT_PATH))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::OK {
            Ok(SubmitOutcome::accepted(body))
        } else {
            let message = if body.is_empty() {
                format!("status {}", status.as_u16())
            } else {
                body
            };
            Ok(SubmitOutcome::rejected(message))
        }
    }
}

#[async_trait]
impl Toolkit for ToolkitClient {
    #[instrument(level = "debug", skip(self))]
    async fn poll(&self, job_name: &str) -> RemoteSignal {
        let response = self
            .http
            .post(endpoint(&self.base_url, POLL_PATH))
            .timeout(self.timeout)
            .json(&PollRequest { job_name })
            .send()
            .await;

        match response {
            Ok(response) => {
                let code = response.status().as_u16();
                let signal = RemoteSignal::from_status_code(code);
                if signal == RemoteSignal::Other {
                    warn!(job_name, code, "unexpected status from job-execution service");
                } else {
                    debug!(code, %signal, "poll answered");
                }
                signal
            }
            Err(e) => {
                warn!(job_name, timeout = e.is_timeout(), error = %e, "poll failed");
                RemoteSignal::Other
            }
        }
    }

    #[instrument(level = "debug", skip(self, files), fields(files = files.len()))]
    async fn submit(&self, job_name: &str, files: Vec<UploadFile>) -> SubmitOutcome {
        match self.upload(files).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(job_name, error = %e, "job upload failed");
                SubmitOutcome::rejected(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_base_url() {
        let config = ToolkitConfig {
            base_url: " ".into(),
            ..Default::default()
        };
        assert!(matches!(
            ToolkitClient::new(&config),
            Err(ToolkitError::InvalidConfig(_))
        ));
    }

    #[test]
    fn poll_request_body() {
        let body = serde_json::to_value(PollRequest { job_name: "lora-run-1" }).unwrap();
        assert_eq!(body, serde_json::json!({"job_name": "lora-run-1"}));
    }
}
