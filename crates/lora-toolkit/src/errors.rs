use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("http request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("invalid toolkit configuration: {0}")]
    InvalidConfig(String),
}
