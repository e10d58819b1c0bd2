//! The recurring reconciliation driver.
//!
//! One control loop: load active tasks, reconcile them concurrently, wait for
//! the whole fan-out, sleep, repeat. A task is therefore never reconciled by
//! two cycles at once.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use lora_model::{Task, TaskStatus};
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    metrics::{MetricsBackend, NoopMetrics},
    reconcile::{ReconcileOutcome, StatusReconciler},
    remote::{ArtifactNotifier, Toolkit},
    store::{TaskSession, TaskStore},
};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sleep between cycles.
    pub interval: Duration,
    /// Maximum number of active tasks loaded per cycle.
    pub batch_size: usize,
    /// Maximum number of reconciliations in flight at once.
    pub max_concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            batch_size: 10,
            max_concurrency: 10,
        }
    }
}

/// Tally of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub loaded: usize,
    pub transitioned: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub aborted: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Transitioned { .. } => self.transitioned += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
            ReconcileOutcome::Skipped => self.skipped += 1,
            ReconcileOutcome::Aborted => self.aborted += 1,
        }
    }
}

pub struct ReconciliationScheduler<T, N> {
    store: Arc<dyn TaskStore>,
    reconciler: Arc<StatusReconciler<T, N>>,
    config: SchedulerConfig,
    metrics: Arc<dyn MetricsBackend>,
}

impl<T, N> ReconciliationScheduler<T, N>
where
    T: Toolkit,
    N: ArtifactNotifier,
{
    pub fn new(
        store: Arc<dyn TaskStore>,
        reconciler: StatusReconciler<T, N>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            reconciler: Arc::new(reconciler),
            config,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run cycles until `cancel` fires.
    ///
    /// Cancellation is observed between cycles: a running cycle always
    /// finishes. The scheduler (and with it the outbound connection pool) is
    /// dropped on return.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            max_concurrency = self.config.max_concurrency,
            "task monitoring started"
        );

        while !cancel.is_cancelled() {
            let report = self.run_cycle().await;
            if report.loaded > 0 {
                debug!(?report, "reconciliation cycle finished");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        drop(self);
        info!("task monitoring stopped");
    }

    /// One cycle: load the active set and reconcile every task in it.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();

        let session: Arc<dyn TaskSession> = match self.store.session() {
            Ok(session) => Arc::from(session),
            Err(e) => {
                error!(error = %e, "failed to open task store session; retrying next cycle");
                return report;
            }
        };

        let tasks = match session.list_by_status(TaskStatus::active_set(), self.config.batch_size)
        {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "failed to load active tasks; retrying next cycle");
                return report;
            }
        };
        report.loaded = tasks.len();

        if tasks.is_empty() {
            debug!("no tasks to monitor");
            self.metrics.record_cycle(0, started.elapsed());
            return report;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut reconciliations = JoinSet::new();

        for task in tasks {
            let reconciler = Arc::clone(&self.reconciler);
            let session = Arc::clone(&session);
            let semaphore = Arc::clone(&semaphore);

            reconciliations.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return ReconcileOutcome::Aborted;
                };
                reconcile_isolated(reconciler, session, task).await
            });
        }

        while let Some(joined) = reconciliations.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    warn!(error = %e, "reconciliation task did not complete");
                    report.aborted += 1;
                }
            }
        }

        self.metrics.record_cycle(report.loaded, started.elapsed());
        report
    }
}

/// Reconcile one task on its own tokio task so a panic stays contained and
/// forces just that task to `FAILED`.
async fn reconcile_isolated<T, N>(
    reconciler: Arc<StatusReconciler<T, N>>,
    session: Arc<dyn TaskSession>,
    task: Task,
) -> ReconcileOutcome
where
    T: Toolkit,
    N: ArtifactNotifier,
{
    let (id, status) = (task.id, task.status);
    let attempt = tokio::spawn({
        let reconciler = Arc::clone(&reconciler);
        let session = Arc::clone(&session);
        async move { reconciler.reconcile(session.as_ref(), &task).await }
    });

    match attempt.await {
        Ok(outcome) => outcome,
        Err(e) => reconciler.force_failed(session.as_ref(), id, status, &e.to_string()),
    }
}
