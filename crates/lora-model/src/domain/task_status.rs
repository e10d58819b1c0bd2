use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a training task.
///
/// ```text
/// PENDING ──► TRAINING ──► RUN_BEFORE ──► RUNNING ──► COMPLETED
///    │            │             │            │
///    └────────────┴─────────────┴────────────┴──► FAILED
/// ```
///
/// `PENDING` may also jump straight to `RUN_BEFORE` when the first poll
/// already reports the job as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted by the job-execution service, not yet observed running.
    Pending,
    /// The job-execution service reports the job as still training.
    Training,
    /// Training finished; artifact retrieval has been requested.
    RunBefore,
    /// Artifacts were retrieved and unpacked by the retrieval service.
    Running,
    /// Finished for good.
    Completed,
    /// Failed for good.
    Failed,
}

/// Statuses polled by the reconciliation loop.
const ACTIVE: [TaskStatus; 2] = [TaskStatus::Pending, TaskStatus::Training];

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::Training,
        TaskStatus::RunBefore,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    /// The statuses eligible for polling in a reconciliation cycle.
    pub fn active_set() -> &'static [TaskStatus] {
        &ACTIVE
    }

    /// Returns `true` if the task is in a terminal state (won't transition further).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Returns `true` if the task is polled by the reconciliation loop.
    pub fn is_active(&self) -> bool {
        ACTIVE.contains(self)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    ///
    /// Identity is not an edge: callers treat it as a no-op.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;

        if self.is_terminal() || *self == next {
            return false;
        }
        match (*self, next) {
            (_, Failed) => true,
            (Pending, Training) | (Pending, RunBefore) | (Training, RunBefore) => true,
            (RunBefore, Running) | (RunBefore, Completed) | (Running, Completed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Training => "training",
            TaskStatus::RunBefore => "run_before",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status: '{0}' (valid: pending, training, run_before, running, completed, failed)")]
pub struct ParseStatusError(pub String);

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == norm)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}
