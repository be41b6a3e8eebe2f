// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [worker]
/// executable = "/opt/blender/blender"
///
/// [execution]
/// timeout = "300s"
/// max_retries = 3
/// retry_backoff = "2s"
///
/// [startup]
/// smoke_test = true
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub worker: WorkerSection,

    #[serde(default)]
    pub execution: RawExecutionSection,

    #[serde(default)]
    pub startup: RawStartupSection,
}

/// `[worker]` section: where to look for the worker executable.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSection {
    /// Explicit path to the worker executable, or a directory containing it.
    ///
    /// Overridden by the `HEADLESS_EXEC_WORKER` environment variable.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Well-known executable names probed inside a configured directory and
    /// on the OS search path.
    #[serde(default = "default_names")]
    pub names: Vec<String>,

    /// Fixed installation locations probed last. `None` means the built-in
    /// list for the current platform.
    #[serde(default)]
    pub common_locations: Option<Vec<PathBuf>>,

    /// Extra arguments inserted after the headless flags.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_names() -> Vec<String> {
    vec!["blender".to_string(), "blender.exe".to_string()]
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            executable: None,
            names: default_names(),
            common_locations: None,
            extra_args: Vec::new(),
        }
    }
}

/// `[execution]` section as written in TOML (durations as strings).
#[derive(Debug, Clone, Deserialize)]
pub struct RawExecutionSection {
    #[serde(default = "default_timeout")]
    pub timeout: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: String,

    /// Bounded wait for the worker to exit after it was force-killed.
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,
}

fn default_timeout() -> String {
    "300s".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff() -> String {
    "2s".to_string()
}

fn default_kill_grace() -> String {
    "5s".to_string()
}

impl Default for RawExecutionSection {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: default_retry_backoff(),
            kill_grace: default_kill_grace(),
        }
    }
}

/// `[startup]` section as written in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStartupSection {
    #[serde(default = "default_version_probe_timeout")]
    pub version_probe_timeout: String,

    #[serde(default = "default_smoke_test")]
    pub smoke_test: bool,

    #[serde(default = "default_smoke_test_timeout")]
    pub smoke_test_timeout: String,
}

fn default_version_probe_timeout() -> String {
    "10s".to_string()
}

fn default_smoke_test() -> bool {
    true
}

fn default_smoke_test_timeout() -> String {
    "30s".to_string()
}

impl Default for RawStartupSection {
    fn default() -> Self {
        Self {
            version_probe_timeout: default_version_probe_timeout(),
            smoke_test: default_smoke_test(),
            smoke_test_timeout: default_smoke_test_timeout(),
        }
    }
}

/// Validated configuration with typed durations.
///
/// Build one with `ConfigFile::try_from(raw)` (see `validate.rs`) or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub worker: WorkerSection,
    pub execution: ExecutionSection,
    pub startup: StartupSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSection {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub kill_grace: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupSection {
    pub version_probe_timeout: Duration,
    pub smoke_test: bool,
    pub smoke_test_timeout: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        worker: WorkerSection,
        execution: ExecutionSection,
        startup: StartupSection,
    ) -> Self {
        Self {
            worker,
            execution,
            startup,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            worker: WorkerSection::default(),
            execution: ExecutionSection {
                timeout: Duration::from_secs(300),
                max_retries: 3,
                retry_backoff: Duration::from_secs(2),
                kill_grace: Duration::from_secs(5),
            },
            startup: StartupSection {
                version_probe_timeout: Duration::from_secs(10),
                smoke_test: true,
                smoke_test_timeout: Duration::from_secs(30),
            },
        }
    }
}
