use std::sync::Arc;

use async_trait::async_trait;
use lora_core::{Overrides, TaskStore, Toolkit, TrainingSubmitter};
use lora_model::{Task, TaskId, TaskPage, TaskQuery};

use crate::{
    error::ApiError,
    handler::{ApiHandler, JobSubmission},
};

/// Bridges [`TrainingSubmitter`] and a [`TaskStore`] to [`ApiHandler`].
pub struct SubmitterAdapter<T: Toolkit> {
    submitter: Arc<TrainingSubmitter<T>>,
    store: Arc<dyn TaskStore>,
}

impl<T: Toolkit> SubmitterAdapter<T> {
    pub fn new(submitter: Arc<TrainingSubmitter<T>>, store: Arc<dyn TaskStore>) -> Self {
        Self { submitter, store }
    }

    /// Raw form values typed after the matching default.
    fn overrides(&self, job: &JobSubmission) -> Result<Overrides, ApiError> {
        let settings = self.submitter.settings();
        let mut out = Overrides::new();
        for (key, raw) in &job.overrides {
            out.insert(key.clone(), settings.coerce(key, raw)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl<T: Toolkit> ApiHandler for SubmitterAdapter<T> {
    async fn submit_job(&self, job: JobSubmission) -> Result<Task, ApiError> {
        let overrides = self.overrides(&job)?;
        let task = self
            .submitter
            .submit(&job.model, &job.job_name, job.files, &overrides)
            .await?;
        Ok(task)
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, ApiError> {
        Ok(self.store.session()?.get(id)?)
    }

    async fn query_tasks(&self, query: TaskQuery) -> Result<TaskPage<Task>, ApiError> {
        Ok(self.store.session()?.query(&query)?)
    }
}
