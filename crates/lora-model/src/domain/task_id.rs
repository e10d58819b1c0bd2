use std::fmt;

use serde::{Deserialize, Serialize};

/// Store-assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
