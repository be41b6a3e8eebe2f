// src/script/correlation.rs

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::errors::{ExecError, Result};

const MAX_LEN: usize = 128;

/// Per-call id that disambiguates marker lines and names the entry-script
/// file inside the workspace.
///
/// Restricted to `[A-Za-z0-9_.-]` so it is safe both as a file name and
/// inside a string literal of the generated entry script.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Fresh id of the form `script_<uuid>`.
    pub fn generate() -> Self {
        Self::with_prefix("script")
    }

    pub(crate) fn with_prefix(prefix: &str) -> Self {
        CorrelationId(format!("{prefix}_{}", Uuid::new_v4().simple()))
    }

    /// Validate a caller-supplied id.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(ExecError::Validation(
                "correlation id must not be empty".to_string(),
            ));
        }
        if raw.len() > MAX_LEN {
            return Err(ExecError::Validation(format!(
                "correlation id is longer than {MAX_LEN} characters"
            )));
        }
        if raw == "." || raw == ".." {
            return Err(ExecError::Validation(format!(
                "correlation id {raw:?} is not a valid file name"
            )));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(ExecError::Validation(format!(
                "correlation id {raw:?} contains unsupported character {bad:?}; \
                 allowed: letters, digits, '_', '-', '.'"
            )));
        }
        Ok(CorrelationId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
