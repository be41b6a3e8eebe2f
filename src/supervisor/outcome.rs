// src/supervisor/outcome.rs

//! Caller-facing result envelope.
//!
//! ```json
//! {"success": true, "output": "...", "correlation_id": "script_…", "attempts": 1, "elapsed_ms": 812}
//! {"success": false, "error_kind": "script", "message": "ZeroDivisionError: division by zero", "traceback": "..."}
//! ```

use serde::Serialize;

use crate::errors::{ErrorKind, ExecError, Result};
use crate::script::CorrelationId;
use crate::supervisor::request::ExecutionOutput;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExecutionOutcome {
    Success {
        success: bool,
        output: String,
        correlation_id: CorrelationId,
        success_marker: bool,
        attempts: u32,
        elapsed_ms: u64,
    },
    Failure {
        success: bool,
        error_kind: ErrorKind,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        traceback: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        script: Option<String>,
    },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }
}

impl From<Result<ExecutionOutput>> for ExecutionOutcome {
    fn from(result: Result<ExecutionOutput>) -> Self {
        match result {
            Ok(out) => ExecutionOutcome::Success {
                success: true,
                output: out.output,
                correlation_id: out.correlation_id,
                success_marker: out.success_marker,
                attempts: out.attempts,
                elapsed_ms: out.elapsed.as_millis() as u64,
            },
            Err(err) => ExecutionOutcome::from(err),
        }
    }
}

impl From<ExecError> for ExecutionOutcome {
    fn from(err: ExecError) -> Self {
        let error_kind = err.kind();
        let message = err.to_string();
        let (traceback, stderr, script) = match err {
            ExecError::Script {
                traceback, script, ..
            } => (non_empty(traceback), None, script),
            ExecError::Launch { stderr, .. } => (None, non_empty(stderr), None),
            _ => (None, None, None),
        };
        ExecutionOutcome::Failure {
            success: false,
            error_kind,
            message,
            traceback,
            stderr,
            script,
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}
