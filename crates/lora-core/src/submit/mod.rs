//! One-shot job creation: validate, merge settings, upload, insert.
mod settings;
pub use settings::{AdvancedSettings, Overrides};

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use lora_model::{FileKind, NewTask, Task, UploadFile};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    error::{StoreError, SubmitError},
    metrics::{MetricsBackend, NoopMetrics},
    remote::Toolkit,
    store::TaskStore,
};

pub struct TrainingSubmitter<T> {
    toolkit: Arc<T>,
    store: Arc<dyn TaskStore>,
    settings: AdvancedSettings,
    metrics: Arc<dyn MetricsBackend>,
    /// Names with an upload in flight; closes the gap between the duplicate
    /// check and the insert.
    in_flight: Mutex<HashSet<String>>,
}

impl<T> TrainingSubmitter<T>
where
    T: Toolkit,
{
    pub fn new(toolkit: Arc<T>, store: Arc<dyn TaskStore>) -> Self {
        Self {
            toolkit,
            store,
            settings: AdvancedSettings::default(),
            metrics: Arc::new(NoopMetrics),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn settings(&self) -> &AdvancedSettings {
        &self.settings
    }

    /// Submit a training job and record it as `PENDING`.
    ///
    /// Nothing is written to the store unless the job-execution service
    /// accepted the upload.
    #[instrument(level = "info", skip(self, files, overrides), fields(files = files.len()))]
    pub async fn submit(
        &self,
        model: &str,
        job_name: &str,
        files: Vec<UploadFile>,
        overrides: &Overrides,
    ) -> Result<Task, SubmitError> {
        let result = self.try_submit(job_name, files, overrides).await;
        let outcome = match &result {
            Ok(_) => "created",
            Err(e) if e.is_validation() => "invalid",
            Err(SubmitError::Rejected(_)) => "rejected",
            Err(_) => "error",
        };
        self.metrics.record_submission(outcome);
        result
    }

    async fn try_submit(
        &self,
        job_name: &str,
        files: Vec<UploadFile>,
        overrides: &Overrides,
    ) -> Result<Task, SubmitError> {
        let job_name = job_name.trim();
        if job_name.is_empty() {
            return Err(SubmitError::EmptyJobName);
        }

        let (config_file, images) = split_uploads(files)?;

        let _reservation = self.reserve(job_name)?;
        if self.store.session()?.find_by_name(job_name)?.is_some() {
            return Err(SubmitError::DuplicateName(job_name.to_string()));
        }

        let mut doc: Value = serde_yaml::from_slice(&config_file.bytes)
            .map_err(|e| SubmitError::InvalidConfig(e.to_string()))?;
        self.settings.apply(&mut doc, job_name, overrides)?;
        let yaml =
            serde_yaml::to_string(&doc).map_err(|e| SubmitError::InvalidConfig(e.to_string()))?;

        let mut upload = Vec::with_capacity(images.len() + 1);
        upload.push(UploadFile::new(config_file.file_name, yaml));
        upload.extend(images);

        let outcome = self.toolkit.submit(job_name, upload).await;
        if !outcome.accepted {
            warn!(job_name, message = %outcome.message, "job-execution service rejected the job");
            return Err(SubmitError::Rejected(outcome.message));
        }

        let task = self
            .store
            .session()?
            .create(NewTask::new(job_name, doc))
            .map_err(|e| match e {
                StoreError::Conflict(name) => SubmitError::DuplicateName(name),
                other => SubmitError::Store(other),
            })?;
        info!(task_id = %task.id, job_name, "training task created");
        Ok(task)
    }
}

impl<T> TrainingSubmitter<T> {
    fn reserve(&self, job_name: &str) -> Result<NameReservation<'_>, SubmitError> {
        let mut names = self
            .in_flight
            .lock()
            .map_err(|_| StoreError::Unavailable("submission registry poisoned".into()))?;
        if !names.insert(job_name.to_string()) {
            return Err(SubmitError::DuplicateName(job_name.to_string()));
        }
        Ok(NameReservation {
            names: &self.in_flight,
            name: job_name.to_string(),
        })
    }
}

/// Releases the job name when the submission finishes, either way.
struct NameReservation<'a> {
    names: &'a Mutex<HashSet<String>>,
    name: String,
}

impl Drop for NameReservation<'_> {
    fn drop(&mut self) {
        if let Ok(mut names) = self.names.lock() {
            names.remove(&self.name);
        }
    }
}

/// Human-readable confirmation for a created task.
pub fn success_message(task: &Task) -> String {
    format!("task {} submitted, id {}", task.name, task.id)
}

/// Pick the config document and the images out of the uploads.
fn split_uploads(files: Vec<UploadFile>) -> Result<(UploadFile, Vec<UploadFile>), SubmitError> {
    let mut config = None;
    let mut images = Vec::new();

    for file in files {
        match file.kind() {
            FileKind::Config if config.is_none() => config = Some(file),
            FileKind::Config => {
                warn!(file = %file.file_name, "ignoring extra config document");
            }
            FileKind::Image => images.push(file),
            FileKind::Unsupported => {
                warn!(file = %file.file_name, "ignoring unsupported upload");
            }
        }
    }

    let config = config.ok_or(SubmitError::MissingConfig)?;
    Ok((config, images))
}
