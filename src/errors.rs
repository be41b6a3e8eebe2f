// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Every failure the supervisor can hand back to a caller is one variant of
//! [`ExecError`]. Callers that only need a coarse classification (for
//! example to build a response envelope) use [`ExecError::kind`].

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    /// The request was rejected before anything was spawned.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No runnable worker executable could be found at startup.
    #[error("Worker executable not found (configured: {}); tried: {}", display_configured(.configured), display_tried(.tried))]
    WorkerNotFound {
        configured: Option<PathBuf>,
        tried: Vec<PathBuf>,
    },

    /// The worker never reached the START marker of the entry script.
    #[error("Worker failed to launch script: {message}")]
    Launch {
        message: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// Every attempt exceeded its deadline.
    #[error("Script execution timed out after {:.1}s ({attempts} attempts)", .elapsed.as_secs_f64())]
    Timeout { elapsed: Duration, attempts: u32 },

    /// The embedded script raised.
    #[error("Script error: {message}")]
    Script {
        message: String,
        traceback: String,
        script: Option<String>,
    },

    /// Any other orchestration failure.
    #[error("Unexpected error while {context}: {source:#}")]
    Unexpected {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Coarse classification of an [`ExecError`], as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    WorkerNotFound,
    Launch,
    Timeout,
    Script,
    Unexpected,
    Config,
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::Validation(_) => ErrorKind::Validation,
            ExecError::WorkerNotFound { .. } => ErrorKind::WorkerNotFound,
            ExecError::Launch { .. } => ErrorKind::Launch,
            ExecError::Timeout { .. } => ErrorKind::Timeout,
            ExecError::Script { .. } => ErrorKind::Script,
            ExecError::Unexpected { .. } | ExecError::IoError(_) => ErrorKind::Unexpected,
            ExecError::ConfigError(_) | ExecError::TomlError(_) => ErrorKind::Config,
        }
    }

    /// Only timeouts are worth resubmitting; everything else is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExecError::Timeout { .. })
    }

    /// Wrap an orchestration error with a short description of what was
    /// being done when it happened.
    pub fn unexpected(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        ExecError::Unexpected {
            context: context.into(),
            source: source.into(),
        }
    }
}

fn display_configured(configured: &Option<PathBuf>) -> String {
    match configured {
        Some(p) => p.display().to_string(),
        None => "<none>".to_string(),
    }
}

fn display_tried(tried: &[PathBuf]) -> String {
    if tried.is_empty() {
        return "<nothing>".to_string();
    }
    tried
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ExecError>;
