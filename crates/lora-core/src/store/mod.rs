//! Durable record of tasks.
//!
//! The core only needs the handful of operations on [`TaskSession`]; any
//! persistence engine can sit behind [`TaskStore`]. A session is meant to be
//! short-lived: the scheduler opens one per cycle and drops it before sleeping.
mod memory;
pub use memory::MemoryTaskStore;

use lora_model::{NewTask, Task, TaskId, TaskPage, TaskQuery, TaskStatus};

use crate::error::StoreError;

/// Hands out scoped store sessions.
pub trait TaskStore: Send + Sync + 'static {
    fn session(&self) -> Result<Box<dyn TaskSession>, StoreError>;
}

/// Operations available within one store session.
pub trait TaskSession: Send + Sync {
    /// Tasks whose status is one of `statuses`, oldest first, at most `limit`.
    fn list_by_status(&self, statuses: &[TaskStatus], limit: usize)
    -> Result<Vec<Task>, StoreError>;

    fn find_by_name(&self, name: &str) -> Result<Option<Task>, StoreError>;

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Filtered, paginated listing. `total` counts matches before pagination.
    fn query(&self, query: &TaskQuery) -> Result<TaskPage<Task>, StoreError>;

    /// Insert a task in `PENDING`. Fails with [`StoreError::Conflict`] on a duplicate name.
    fn create(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Move task `id` from `from` to `to`, bumping `updated_at`.
    ///
    /// Compare-and-set: fails with [`StoreError::StaleStatus`] when the stored
    /// status is no longer `from`. Lifecycle rules are not checked here.
    fn transition(&self, id: TaskId, from: TaskStatus, to: TaskStatus)
    -> Result<Task, StoreError>;
}
