// src/locate/handle.rs

use std::path::{Path, PathBuf};

use serde::Serialize;

/// The resolved worker executable.
///
/// Created once at startup and read-only afterwards, so it is shared between
/// concurrent calls behind an `Arc` without any locking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerHandle {
    path: PathBuf,
    version: String,
    valid: bool,
}

impl WorkerHandle {
    /// A handle whose `--version` probe succeeded.
    pub fn new(path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            valid: true,
        }
    }

    /// A handle that was never probed. Used when the caller already knows
    /// the executable, e.g. in tests against fake workers.
    pub fn unverified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            version: "unknown".to_string(),
            valid: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
