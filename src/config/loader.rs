// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ExecError, Result};

/// Environment variable that replaces `[worker].executable`.
pub const WORKER_ENV_VAR: &str = "HEADLESS_EXEC_WORKER";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate values.
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        ExecError::ConfigError(format!("reading config file {}: {e}", path.display()))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, apply environment overrides and
/// validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let mut raw = load_from_path(&path)?;
    apply_env_overrides(&mut raw, std::env::var_os(WORKER_ENV_VAR).map(PathBuf::from));
    ConfigFile::try_from(raw)
}

/// Resolve configuration for the CLI.
///
/// - An explicit path must exist.
/// - Without one, `HeadlessExec.toml` in the working directory is used if it
///   exists; otherwise built-in defaults apply.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "loading config");
        return load_and_validate(path);
    }

    let default_path = default_config_path();
    if default_path.is_file() {
        info!(path = %default_path.display(), "loading default config");
        return load_and_validate(&default_path);
    }

    debug!("no config file found; using built-in defaults");
    let mut raw = RawConfigFile::default();
    apply_env_overrides(&mut raw, std::env::var_os(WORKER_ENV_VAR).map(PathBuf::from));
    ConfigFile::try_from(raw)
}

/// Apply the worker-path override, if any. Empty values are ignored.
pub fn apply_env_overrides(raw: &mut RawConfigFile, worker_override: Option<PathBuf>) {
    if let Some(path) = worker_override {
        if !path.as_os_str().is_empty() {
            debug!(path = %path.display(), "worker executable overridden from environment");
            raw.worker.executable = Some(path);
        }
    }
}

/// Default config file location: `HeadlessExec.toml` in the current working
/// directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("HeadlessExec.toml")
}
