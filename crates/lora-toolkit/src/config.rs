use std::time::Duration;

/// Where and how to reach the job-execution service.
#[derive(Debug, Clone)]
pub struct ToolkitConfig {
    /// Base URL, e.g. `http://172.25.0.1:7861`.
    pub base_url: String,
    /// Timeout applied to every call.
    pub request_timeout: Duration,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            base_url: "http://172.25.0.1:7861".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// What the artifact retrieval service needs to pull a finished job.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the retrieval service.
    pub service_url: String,
    /// Database descriptor handed to the retrieval service.
    pub database_url: String,
    /// Job-execution service URL the retrieval service downloads from.
    pub toolkit_url: String,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:8000".to_string(),
            database_url: String::new(),
            toolkit_url: ToolkitConfig::default().base_url,
            timeout: Duration::from_secs(60),
        }
    }
}

pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}
