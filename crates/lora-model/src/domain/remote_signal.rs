use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized outcome of a status poll against the job-execution service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteSignal {
    /// The job finished and its artifacts are ready.
    Ok,
    /// The job was accepted and is still running.
    Accepted,
    /// Anything else, including transport failures and timeouts.
    Other,
}

impl RemoteSignal {
    /// Map an HTTP status code of a `get_zip` poll to a signal.
    pub fn from_status_code(code: u16) -> Self {
        match code {
            200 => RemoteSignal::Ok,
            201 => RemoteSignal::Accepted,
            _ => RemoteSignal::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteSignal::Ok => "ok",
            RemoteSignal::Accepted => "accepted",
            RemoteSignal::Other => "other",
        }
    }
}

impl fmt::Display for RemoteSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
