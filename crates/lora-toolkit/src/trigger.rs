use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use lora_core::{ArtifactNotifier, NotificationError};
use lora_model::TaskId;

use crate::config::{FetchConfig, endpoint};

const FETCH_PATH: &str = "get_file";

#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    database_url: &'a str,
    task_id: u64,
    toolkit_url: &'a str,
}

/// Fire-and-forget notification to the artifact retrieval service.
///
/// Only delivery matters: the response is logged, never interpreted. The
/// retrieval service owns its own retries and updates the task out of band.
pub struct ArtifactFetchTrigger {
    http: reqwest::Client,
    config: FetchConfig,
}

impl ArtifactFetchTrigger {
    /// `http` is usually [`crate::ToolkitClient::http`], so both share one pool.
    pub fn new(http: reqwest::Client, config: FetchConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ArtifactNotifier for ArtifactFetchTrigger {
    #[instrument(level = "debug", skip(self))]
    async fn notify(&self, task_id: TaskId) -> Result<(), NotificationError> {
        let body = FetchRequest {
            database_url: &self.config.database_url,
            task_id: task_id.get(),
            toolkit_url: &self.config.toolkit_url,
        };

        let response = self
            .http
            .post(endpoint(&self.config.service_url, FETCH_PATH))
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Timeout
                } else {
                    NotificationError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(%task_id, "artifact retrieval accepted");
        } else {
            warn!(%task_id, code = status.as_u16(), "artifact retrieval service answered with an error");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = FetchRequest {
            database_url: "postgresql://db/postgres",
            task_id: 3,
            toolkit_url: "http://toolkit:7861",
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({
                "database_url": "postgresql://db/postgres",
                "task_id": 3,
                "toolkit_url": "http://toolkit:7861",
            })
        );
    }
}
