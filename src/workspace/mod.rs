// src/workspace/mod.rs

//! Private temp directory holding entry-script files.
//!
//! The directory lives for the whole process (open once, share, close at
//! shutdown). Script files are call-scoped: [`Workspace::write_script`]
//! returns a [`ScriptFile`] guard that deletes the file when it is dropped,
//! so every exit path of a call (including errors while spawning) removes
//! it. File names are keyed by correlation id, which keeps concurrent calls
//! from ever touching each other's files without any locking.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::script::{CorrelationId, WrappedScript};

const DIR_PREFIX: &str = "headless_exec_";
const WRITE_PROBE: &str = ".write_probe";

#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Mutex<Option<TempDir>>,
}

impl Workspace {
    /// Create a private directory under the system temp dir.
    pub fn open() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir()
            .context("creating workspace directory")?;
        Self::from_tempdir(dir)
    }

    /// Create a private directory under `parent`.
    pub fn open_in(parent: impl AsRef<Path>) -> Result<Self> {
        let parent = parent.as_ref();
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(parent)
            .with_context(|| format!("creating workspace directory in {:?}", parent))?;
        Self::from_tempdir(dir)
    }

    fn from_tempdir(dir: TempDir) -> Result<Self> {
        let path = dir.path().to_path_buf();

        let probe = path.join(WRITE_PROBE);
        std::fs::write(&probe, b"probe")
            .with_context(|| format!("workspace {:?} is not writable", path))?;
        std::fs::remove_file(&probe)
            .with_context(|| format!("removing write probe {:?}", probe))?;

        debug!(workspace = %path.display(), "workspace opened");
        Ok(Self {
            path,
            dir: Mutex::new(Some(dir)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the entry script for `id`.
    pub fn script_path(&self, id: &CorrelationId) -> PathBuf {
        self.path.join(format!("{id}.py"))
    }

    /// Persist `script` and hand back the guard that owns the file.
    pub async fn write_script(&self, script: &WrappedScript) -> Result<ScriptFile> {
        let path = self.script_path(&script.correlation_id);
        tokio::fs::write(&path, script.text.as_bytes())
            .await
            .with_context(|| format!("writing entry script {:?}", path))?;
        debug!(
            correlation_id = %script.correlation_id,
            path = %path.display(),
            "entry script written"
        );
        Ok(ScriptFile { path: Some(path) })
    }

    /// Delete one file, logging instead of failing.
    pub fn remove(&self, path: &Path) {
        remove_logged(path);
    }

    /// Recursively delete the directory, logging instead of failing.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn close(&self) {
        let dir = match self.dir.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(dir) = dir else {
            return;
        };
        match dir.close() {
            Ok(()) => debug!(workspace = %self.path.display(), "workspace removed"),
            Err(e) => warn!(
                workspace = %self.path.display(),
                error = %e,
                "could not remove workspace directory"
            ),
        }
    }
}

/// An entry-script file owned by a single call.
#[derive(Debug)]
pub struct ScriptFile {
    path: Option<PathBuf>,
}

impl ScriptFile {
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Delete the file now instead of at drop.
    pub fn remove(mut self) {
        if let Some(path) = self.path.take() {
            remove_logged(&path);
        }
    }
}

impl Drop for ScriptFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            remove_logged(&path);
        }
    }
}

fn remove_logged(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed entry script"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove entry script"),
    }
}
