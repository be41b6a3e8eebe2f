// src/supervisor/request.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::script::CorrelationId;

/// One call to [`crate::supervisor::Supervisor::execute`].
///
/// Owned by the issuing call; never shared between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub script: String,
    pub working_file: Option<PathBuf>,
    /// Per-attempt deadline; `None` uses the supervisor default.
    pub timeout: Option<Duration>,
    /// Caller-chosen id; `None` generates a fresh one.
    pub correlation_id: Option<String>,
    /// Retries already consumed before this request was issued.
    pub retry_count: u32,
}

impl ExecutionRequest {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            working_file: None,
            timeout: None,
            correlation_id: None,
            retry_count: 0,
        }
    }

    pub fn working_file(mut self, path: impl AsRef<Path>) -> Self {
        self.working_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// Successful execution: captured stdout plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub correlation_id: CorrelationId,
    pub output: String,
    /// False when the script finished without printing `SUCCESS:<id>`.
    pub success_marker: bool,
    pub attempts: u32,
    pub elapsed: Duration,
}
