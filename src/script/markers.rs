// src/script/markers.rs

//! Marker protocol vocabulary.
//!
//! The entry script reports its outcome on stdout with lines of the form
//! `<TAG>:<correlation id>`, optionally followed by ` - <payload>`:
//!
//! ```text
//! START:script_1f2e
//! ...caller output...
//! SUCCESS:script_1f2e
//! ```
//!
//! [`Markers`] precomputes the prefixes for one id and classifies lines
//! exactly, so `START:abc` never matches a call whose id is `abcd` and
//! caller output that merely mentions a marker in the middle of a line is
//! ignored.

use crate::script::CorrelationId;

/// Separator between a marker prefix and its payload.
pub const PAYLOAD_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    Success,
    Error,
    Traceback,
}

impl Marker {
    pub fn tag(self) -> &'static str {
        match self {
            Marker::Start => "START",
            Marker::Success => "SUCCESS",
            Marker::Error => "ERROR",
            Marker::Traceback => "TRACEBACK",
        }
    }

    pub fn prefix(self, id: &CorrelationId) -> String {
        format!("{}:{}", self.tag(), id)
    }
}

/// One stdout line, classified against a single correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLine<'a> {
    Start,
    Success,
    Error(&'a str),
    Traceback(&'a str),
    Other,
}

/// Marker prefixes for one correlation id.
#[derive(Debug, Clone)]
pub struct Markers {
    start: String,
    success: String,
    error: String,
    traceback: String,
}

impl Markers {
    pub fn for_id(id: &CorrelationId) -> Self {
        Self {
            start: Marker::Start.prefix(id),
            success: Marker::Success.prefix(id),
            error: Marker::Error.prefix(id),
            traceback: Marker::Traceback.prefix(id),
        }
    }

    pub fn classify<'a>(&self, line: &'a str) -> MarkerLine<'a> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix(self.start.as_str()) {
            if rest.trim_end().is_empty() {
                return MarkerLine::Start;
            }
        } else if let Some(rest) = line.strip_prefix(self.success.as_str()) {
            if rest.trim_end().is_empty() {
                return MarkerLine::Success;
            }
        } else if let Some(rest) = line.strip_prefix(self.error.as_str()) {
            if let Some(payload) = payload(rest) {
                return MarkerLine::Error(payload);
            }
        } else if let Some(rest) = line.strip_prefix(self.traceback.as_str()) {
            if let Some(payload) = payload(rest) {
                return MarkerLine::Traceback(payload);
            }
        }

        MarkerLine::Other
    }

    /// True when any line of `stdout` is this id's START marker.
    pub fn has_start(&self, stdout: &str) -> bool {
        stdout
            .lines()
            .any(|line| self.classify(line) == MarkerLine::Start)
    }
}

fn payload(rest: &str) -> Option<&str> {
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix(PAYLOAD_SEPARATOR)
        .or_else(|| (rest == PAYLOAD_SEPARATOR.trim_end()).then_some(""))
}
