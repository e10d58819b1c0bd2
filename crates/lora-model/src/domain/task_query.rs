use super::TaskStatus;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Query parameters for listing tasks with filtering and pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub limit: usize,
    pub offset: usize,
}

/// Result of a paginated task query.
#[derive(Debug, Clone)]
pub struct TaskPage<T> {
    pub items: Vec<T>,
    /// Matching rows before pagination.
    pub total: usize,
}

impl TaskQuery {
    pub fn new() -> Self {
        Self {
            status: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_LIMIT);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_capped() {
        let q = TaskQuery::new().with_limit(50_000);
        assert_eq!(q.limit, MAX_LIMIT);
    }

    #[test]
    fn default_has_no_filter() {
        let q = TaskQuery::default();
        assert!(q.status.is_none());
        assert_eq!(q.limit, DEFAULT_LIMIT);
        assert_eq!(q.offset, 0);
    }
}
