// src/output/parser.rs

//! Marker-driven output parser.
//!
//! Lines are classified one at a time (see [`Markers::classify`]) and fed
//! through a small state machine:
//!
//! ```text
//! AwaitingStart --START--> Running --SUCCESS--> Succeeded
//!                             |
//!                             +--ERROR/TRACEBACK--> (recorded, stays Running)
//! ```
//!
//! Marker lines seen before START are ignored: nothing the entry script
//! prints can precede it, so they can only be noise from the worker.
//!
//! Decision order once all lines are consumed:
//! 1. never reached START: launch error,
//! 2. any ERROR/TRACEBACK lines: script error,
//! 3. SUCCESS seen: success,
//! 4. neither: success, with a warning.

use tracing::{debug, warn};

use crate::errors::{ExecError, Result};
use crate::script::markers::MarkerLine;
use crate::script::{CorrelationId, Markers};

/// Successful parse result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutput {
    /// Full captured stdout.
    pub output: String,
    /// Whether the `SUCCESS:<id>` marker was observed.
    pub success_marker: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    AwaitingStart,
    Running,
    Succeeded,
}

pub fn parse(stdout: &str, stderr: &str, id: &CorrelationId) -> Result<ParsedOutput> {
    let markers = Markers::for_id(id);
    let mut state = ParseState::AwaitingStart;
    let mut errors: Vec<&str> = Vec::new();
    let mut tracebacks: Vec<&str> = Vec::new();

    for line in stdout.lines() {
        let class = markers.classify(line);
        state = match (state, class) {
            (ParseState::AwaitingStart, MarkerLine::Start) => ParseState::Running,
            (ParseState::AwaitingStart, _) => ParseState::AwaitingStart,
            (_, MarkerLine::Error(msg)) => {
                errors.push(msg);
                state
            }
            (_, MarkerLine::Traceback(trace)) => {
                tracebacks.push(trace);
                state
            }
            (ParseState::Running, MarkerLine::Success) => ParseState::Succeeded,
            (s, _) => s,
        };
    }

    if state == ParseState::AwaitingStart {
        debug!(correlation_id = %id, "no START marker in worker stdout");
        return Err(ExecError::Launch {
            message: format!("entry script never started (no START:{id} marker)"),
            stderr: stderr.to_string(),
            exit_code: None,
        });
    }

    if !errors.is_empty() || !tracebacks.is_empty() {
        let message = if errors.is_empty() {
            "script failed without an error message".to_string()
        } else {
            errors.join("; ")
        };
        return Err(ExecError::Script {
            message,
            traceback: tracebacks.join("\n"),
            script: None,
        });
    }

    let success_marker = state == ParseState::Succeeded;
    if !success_marker {
        warn!(
            correlation_id = %id,
            "script finished without a SUCCESS marker; treating as success"
        );
    }

    Ok(ParsedOutput {
        output: stdout.to_string(),
        success_marker,
    })
}
