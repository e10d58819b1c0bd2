//! Seams to the services the core talks to over the network.
//!
//! Implementations live in `lora-toolkit`; tests plug in scripted fakes.
use async_trait::async_trait;

use lora_model::{RemoteSignal, SubmitOutcome, TaskId, UploadFile};

use crate::error::NotificationError;

/// The external job-execution service.
///
/// Neither call fails: transport errors and timeouts are folded into
/// [`RemoteSignal::Other`] or a rejected [`SubmitOutcome`].
#[async_trait]
pub trait Toolkit: Send + Sync + 'static {
    /// Ask for the state of `job_name`.
    async fn poll(&self, job_name: &str) -> RemoteSignal;

    /// Upload a job: one config document plus any number of binary assets.
    async fn submit(&self, job_name: &str, files: Vec<UploadFile>) -> SubmitOutcome;
}

/// The artifact retrieval service.
#[async_trait]
pub trait ArtifactNotifier: Send + Sync + 'static {
    /// Ask the retrieval service to pull the artifacts of `task_id`.
    ///
    /// Returns once the request is handed over; retrieval itself happens
    /// out of band.
    async fn notify(&self, task_id: TaskId) -> Result<(), NotificationError>;
}
