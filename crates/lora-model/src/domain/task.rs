use std::{collections::BTreeMap, time::SystemTime};

use serde::{Deserialize, Serialize};

use crate::{JobName, TaskId, TaskStatus};

/// A training task as persisted by the task store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier; immutable.
    pub id: TaskId,
    /// Job name shared with the job-execution service; immutable.
    pub name: JobName,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Job configuration as submitted. Never touched by reconciliation.
    pub config: serde_json::Value,
    /// Retrieved artifacts, filled in out of band by the retrieval service.
    #[serde(default)]
    pub result_images: Vec<ResultImage>,
    #[serde(with = "crate::domain::time_serde")]
    pub created_at: SystemTime,
    /// Bumped on every status transition.
    #[serde(with = "crate::domain::time_serde")]
    pub updated_at: SystemTime,
}

/// Fields supplied when inserting a task; the store assigns the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: JobName,
    pub config: serde_json::Value,
}

impl NewTask {
    pub fn new(name: impl Into<JobName>, config: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// Reference to one produced artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultImage {
    pub url: String,
    #[serde(default, flatten)]
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serde_roundtrip() {
        let task = Task {
            id: TaskId(7),
            name: "lora-run-1".to_string(),
            status: TaskStatus::Training,
            config: serde_json::json!({"config": {"name": "lora-run-1"}}),
            result_images: vec![ResultImage {
                url: "http://files/lora-run-1/0001.png".to_string(),
                metadata: BTreeMap::from([("step".to_string(), "2000".to_string())]),
            }],
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "training");
        assert_eq!(json["result_images"][0]["step"], "2000");

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, task.id);
        assert_eq!(back.name, task.name);
        assert_eq!(back.status, task.status);
        assert_eq!(back.result_images, task.result_images);
    }

    #[test]
    fn result_images_default_to_empty() {
        let json = serde_json::json!({
            "id": 1,
            "name": "job",
            "status": "pending",
            "config": {},
            "created_at": 0,
            "updated_at": 0,
        });
        let task: Task = serde_json::from_value(json).unwrap();
        assert!(task.result_images.is_empty());
    }
}
