//! HTTP clients for the job-execution ("toolkit") service and the artifact
//! retrieval service.
mod config;
pub use config::{FetchConfig, ToolkitConfig};

mod errors;
pub use errors::ToolkitError;

mod client;
pub use client::ToolkitClient;

mod trigger;
pub use trigger::ArtifactFetchTrigger;
