//! Per-task status reconciliation.
//!
//! | signal     | target       | side effect                 |
//! |------------|--------------|-----------------------------|
//! | `Ok`       | `RUN_BEFORE` | artifact retrieval request  |
//! | `Accepted` | `TRAINING`   | none                        |
//! | `Other`    | `FAILED`     | none                        |
//!
//! A target equal to the current status is a no-op: nothing is written.
//! `RUN_BEFORE` is written before the retrieval request goes out; if the
//! request cannot be delivered the task moves on to `FAILED`.
use std::sync::Arc;

use lora_model::{RemoteSignal, Task, TaskId, TaskStatus};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::{NotificationError, StoreError},
    metrics::{MetricsBackend, NoopMetrics},
    remote::{ArtifactNotifier, Toolkit},
    store::TaskSession,
};

/// What one reconciliation did to its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The computed status equals the current one; nothing was written.
    Unchanged,
    /// A transition was persisted.
    Transitioned { from: TaskStatus, to: TaskStatus },
    /// The task was not eligible (not active, or the edge is not allowed).
    Skipped,
    /// The write could not be persisted; the next cycle retries.
    Aborted,
}

pub struct StatusReconciler<T, N> {
    toolkit: Arc<T>,
    notifier: Arc<N>,
    metrics: Arc<dyn MetricsBackend>,
}

impl<T, N> StatusReconciler<T, N>
where
    T: Toolkit,
    N: ArtifactNotifier,
{
    pub fn new(toolkit: Arc<T>, notifier: Arc<N>) -> Self {
        Self {
            toolkit,
            notifier,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Local status a remote signal maps to.
    pub fn target_status(signal: RemoteSignal) -> TaskStatus {
        match signal {
            RemoteSignal::Ok => TaskStatus::RunBefore,
            RemoteSignal::Accepted => TaskStatus::Training,
            RemoteSignal::Other => TaskStatus::Failed,
        }
    }

    /// Poll the job-execution service for `task` and persist the resulting status.
    #[instrument(level = "debug", skip_all, fields(task_id = %task.id, job_name = %task.name))]
    pub async fn reconcile(&self, session: &dyn TaskSession, task: &Task) -> ReconcileOutcome {
        if !task.status.is_active() {
            debug!(status = %task.status, "task is not active; skipping");
            return ReconcileOutcome::Skipped;
        }

        let signal = self.toolkit.poll(&task.name).await;
        self.metrics.record_poll(signal);
        debug!(%signal, "job-execution service polled");

        let target = Self::target_status(signal);
        if target == task.status {
            debug!(status = %task.status, "status unchanged");
            return ReconcileOutcome::Unchanged;
        }
        if !task.status.can_transition_to(target) {
            warn!(from = %task.status, to = %target, "transition not allowed; skipping");
            return ReconcileOutcome::Skipped;
        }
        if signal == RemoteSignal::Other {
            warn!(from = %task.status, "no usable job status from the job-execution service; failing task");
        }

        let outcome = self.persist(session, task.id, task.status, target);
        if target != TaskStatus::RunBefore
            || !matches!(outcome, ReconcileOutcome::Transitioned { .. })
        {
            return outcome;
        }
        match self.request_artifacts(task.id).await {
            Ok(()) => outcome,
            Err(_) => self.persist(session, task.id, TaskStatus::RunBefore, TaskStatus::Failed),
        }
    }

    /// Force a task to `FAILED` after its reconciliation blew up.
    pub fn force_failed(
        &self,
        session: &dyn TaskSession,
        id: TaskId,
        from: TaskStatus,
        cause: &str,
    ) -> ReconcileOutcome {
        error!(task_id = %id, %cause, "reconciliation failed; forcing task to failed");
        if !from.can_transition_to(TaskStatus::Failed) {
            return ReconcileOutcome::Skipped;
        }
        self.persist(session, id, from, TaskStatus::Failed)
    }

    /// Hand a task that is already `RUN_BEFORE` to the retrieval service.
    ///
    /// Called only after the `RUN_BEFORE` write succeeded, so a task is
    /// announced at most once.
    async fn request_artifacts(&self, id: TaskId) -> Result<(), NotificationError> {
        match self.notifier.notify(id).await {
            Ok(()) => {
                self.metrics.record_notification(true);
                info!(task_id = %id, "artifact retrieval requested");
                Ok(())
            }
            Err(e) => {
                self.metrics.record_notification(false);
                error!(task_id = %id, error = %e, "artifact retrieval request failed; failing task");
                Err(e)
            }
        }
    }

    fn persist(
        &self,
        session: &dyn TaskSession,
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> ReconcileOutcome {
        match session.transition(id, from, to) {
            Ok(_) => {
                self.metrics.record_transition(from, to);
                info!(task_id = %id, %from, %to, "task status updated");
                ReconcileOutcome::Transitioned { from, to }
            }
            Err(e @ StoreError::StaleStatus { .. }) => {
                warn!(task_id = %id, error = %e, "task changed concurrently; leaving it alone");
                ReconcileOutcome::Aborted
            }
            Err(e) => {
                error!(task_id = %id, error = %e, "failed to persist task status");
                ReconcileOutcome::Aborted
            }
        }
    }
}
