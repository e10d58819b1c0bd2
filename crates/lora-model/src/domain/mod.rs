mod task_id;
pub use task_id::TaskId;

mod task_status;
pub use task_status::{ParseStatusError, TaskStatus};

mod remote_signal;
pub use remote_signal::RemoteSignal;

mod task;
pub use task::{NewTask, ResultImage, Task};

mod task_query;
pub use task_query::{TaskPage, TaskQuery};

mod upload;
pub use upload::{FileKind, SubmitOutcome, UploadFile};

mod time_serde;

/// Human-readable job identifier, unique across all tasks.
///
/// Used as the correlation key with the job-execution service.
pub type JobName = String;
