pub mod error;
pub use error::{NotificationError, StoreError, SubmitError};

pub mod metrics;
pub use metrics::{MetricsBackend, NoopMetrics};

pub mod remote;
pub use remote::{ArtifactNotifier, Toolkit};

pub mod store;
pub use store::{MemoryTaskStore, TaskSession, TaskStore};

pub mod reconcile;
pub use reconcile::{ReconcileOutcome, StatusReconciler};

pub mod scheduler;
pub use scheduler::{CycleReport, ReconciliationScheduler, SchedulerConfig};

pub mod submit;
pub use submit::{AdvancedSettings, Overrides, TrainingSubmitter, success_message};
