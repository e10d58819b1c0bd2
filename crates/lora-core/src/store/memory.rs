use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::SystemTime,
};

use lora_model::{NewTask, Task, TaskId, TaskPage, TaskQuery, TaskStatus};
use tracing::trace;

use super::{TaskSession, TaskStore};
use crate::error::StoreError;

/// In-memory task store.
///
/// Sessions share the same underlying map, so writes are visible to every
/// session immediately.
#[derive(Clone)]
pub struct MemoryTaskStore {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    /// Tasks ordered by id (insertion order).
    tasks: BTreeMap<TaskId, Task>,
    /// Index: name -> id.
    by_name: HashMap<String, TaskId>,
    next_id: u64,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                tasks: BTreeMap::new(),
                by_name: HashMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Number of stored tasks.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.tasks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore for MemoryTaskStore {
    fn session(&self) -> Result<Box<dyn TaskSession>, StoreError> {
        Ok(Box::new(MemorySession {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MemorySession {
    inner: Arc<RwLock<Inner>>,
}

impl MemorySession {
    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("task map lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("task map lock poisoned".into()))
    }
}

impl TaskSession for MemorySession {
    fn list_by_status(
        &self,
        statuses: &[TaskStatus],
        limit: usize,
    ) -> Result<Vec<Task>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .tasks
            .values()
            .filter(|task| statuses.contains(&task.status))
            .take(limit)
            .cloned()
            .collect())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Task>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .by_name
            .get(name)
            .and_then(|id| inner.tasks.get(id))
            .cloned())
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let inner = self.read()?;
        Ok(inner.tasks.get(&id).cloned())
    }

    fn query(&self, q: &TaskQuery) -> Result<TaskPage<Task>, StoreError> {
        let inner = self.read()?;

        let filtered: Vec<&Task> = inner
            .tasks
            .values()
            .filter(|task| q.status.is_none_or(|status| task.status == status))
            .collect();
        let total = filtered.len();

        let items = filtered
            .into_iter()
            .skip(q.offset)
            .take(q.limit)
            .cloned()
            .collect();

        Ok(TaskPage { items, total })
    }

    fn create(&self, new: NewTask) -> Result<Task, StoreError> {
        let mut inner = self.write()?;
        if inner.by_name.contains_key(&new.name) {
            return Err(StoreError::Conflict(new.name));
        }

        let id = TaskId(inner.next_id);
        inner.next_id += 1;

        let now = SystemTime::now();
        let task = Task {
            id,
            name: new.name,
            status: TaskStatus::Pending,
            config: new.config,
            result_images: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        inner.by_name.insert(task.name.clone(), id);
        inner.tasks.insert(id, task.clone());
        trace!(%id, name = %task.name, "task inserted");
        Ok(task)
    }

    fn transition(
        &self,
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<Task, StoreError> {
        let mut inner = self.write()?;
        let task = inner.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if task.status != from {
            return Err(StoreError::StaleStatus {
                id,
                expected: from,
                actual: task.status,
            });
        }
        task.status = to;
        task.updated_at = SystemTime::now();
        Ok(task.clone())
    }
}
