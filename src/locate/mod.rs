// src/locate/mod.rs

//! Finding and validating the worker executable at startup.
//!
//! Candidates are probed in this order:
//! 1. the configured path verbatim (plus a `.exe` variant on Windows), or the
//!    well-known executable names inside it when it is a directory,
//! 2. the well-known names in every directory of the OS search path,
//! 3. a fixed list of common installation locations.
//!
//! The first candidate that is an executable file *and* answers `--version`
//! with exit code 0 wins. If none does, [`ExecError::WorkerNotFound`] lists
//! every path that was tried.

pub mod handle;
pub mod smoke;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::errors::{ExecError, Result};
use crate::fs::{FileSystem, RealFileSystem};

pub use handle::WorkerHandle;
pub use smoke::smoke_test;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+(?:\.\d+)?").expect("version regex is valid"));

#[derive(Debug, Clone)]
pub struct LocatorOptions {
    pub configured: Option<PathBuf>,
    pub names: Vec<String>,
    pub common_locations: Vec<PathBuf>,
    /// Value of `PATH` to search; `None` skips the search path entirely.
    pub search_path: Option<OsString>,
    pub version_probe_timeout: Duration,
}

impl LocatorOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            configured: cfg.worker.executable.clone(),
            names: cfg.worker.names.clone(),
            common_locations: cfg
                .worker
                .common_locations
                .clone()
                .unwrap_or_else(default_common_locations),
            search_path: std::env::var_os("PATH"),
            version_probe_timeout: cfg.startup.version_probe_timeout,
        }
    }
}

/// Built-in installation locations for the current platform.
pub fn default_common_locations() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(windows) {
        &[
            r"C:\Program Files\Blender Foundation\Blender 4.4\blender.exe",
            r"C:\Program Files\Blender Foundation\Blender 4.2\blender.exe",
            r"C:\Program Files\Blender Foundation\Blender 4.1\blender.exe",
            r"C:\Program Files\Blender Foundation\Blender 4.0\blender.exe",
            r"C:\Program Files\Blender Foundation\Blender 3.6\blender.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &["/Applications/Blender.app/Contents/MacOS/Blender"]
    } else {
        &[
            "/usr/bin/blender",
            "/usr/local/bin/blender",
            "/snap/bin/blender",
            "/opt/blender/blender",
        ]
    };
    paths.iter().map(PathBuf::from).collect()
}

#[derive(Debug, Clone)]
pub struct WorkerLocator {
    options: LocatorOptions,
    fs: Arc<dyn FileSystem>,
}

impl WorkerLocator {
    pub fn new(options: LocatorOptions) -> Self {
        Self::with_fs(options, Arc::new(RealFileSystem))
    }

    pub fn with_fs(options: LocatorOptions, fs: Arc<dyn FileSystem>) -> Self {
        Self { options, fs }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(LocatorOptions::from_config(cfg))
    }

    /// Every path that will be probed, in probe order, without duplicates.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::new();
        let mut push = |p: PathBuf| {
            if !out.contains(&p) {
                out.push(p);
            }
        };

        if let Some(configured) = &self.options.configured {
            if self.fs.is_dir(configured) {
                for name in &self.options.names {
                    push(configured.join(name));
                }
            } else {
                push(configured.clone());
                if cfg!(windows) && configured.extension().is_none() {
                    push(configured.with_extension("exe"));
                }
            }
        }

        if let Some(search_path) = &self.options.search_path {
            for dir in std::env::split_paths(search_path) {
                if dir.as_os_str().is_empty() {
                    continue;
                }
                for name in &self.options.names {
                    push(dir.join(name));
                }
            }
        }

        for location in &self.options.common_locations {
            push(location.clone());
        }

        out
    }

    pub async fn locate(&self) -> Result<WorkerHandle> {
        let mut tried = Vec::new();

        for candidate in self.candidates() {
            tried.push(candidate.clone());
            if !self.fs.is_file(&candidate) {
                continue;
            }
            if !self.fs.is_executable(&candidate) {
                warn!(candidate = %candidate.display(), "worker candidate is not executable");
                continue;
            }

            debug!(candidate = %candidate.display(), "probing worker candidate");
            match probe_version(&candidate, self.options.version_probe_timeout).await {
                Ok(stdout) => {
                    let path = self
                        .fs
                        .canonicalize(&candidate)
                        .unwrap_or_else(|_| candidate.clone());
                    let version = match parse_version(&stdout) {
                        Some(v) => v,
                        None => {
                            warn!(
                                path = %path.display(),
                                "could not determine worker version from --version output"
                            );
                            "unknown".to_string()
                        }
                    };
                    info!(path = %path.display(), version = %version, "worker located");
                    return Ok(WorkerHandle::new(path, version));
                }
                Err(reason) => {
                    warn!(
                        candidate = %candidate.display(),
                        reason = %reason,
                        "worker candidate is not runnable"
                    );
                }
            }
        }

        Err(ExecError::WorkerNotFound {
            configured: self.options.configured.clone(),
            tried,
        })
    }
}

/// Run `<path> --version`; `Ok(stdout)` when it exits 0 within `timeout`.
async fn probe_version(path: &Path, timeout: Duration) -> std::result::Result<String, String> {
    let mut cmd = Command::new(path);
    cmd.arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(format!("failed to run: {e}")),
        Err(_) => return Err(format!("--version did not finish within {timeout:?}")),
    };

    if !output.status.success() {
        return Err(format!(
            "--version exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// First non-empty line of `--version` output, if it carries a version
/// number.
pub fn parse_version(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    VERSION_RE.is_match(line).then(|| line.to_string())
}
