// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, ExecutionSection, RawConfigFile, StartupSection};
use crate::errors::{ExecError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ExecError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_worker(&raw)?;

        let execution = ExecutionSection {
            timeout: non_zero("execution.timeout", &raw.execution.timeout)?,
            max_retries: raw.execution.max_retries,
            retry_backoff: field("execution.retry_backoff", &raw.execution.retry_backoff)?,
            kill_grace: non_zero("execution.kill_grace", &raw.execution.kill_grace)?,
        };

        let startup = StartupSection {
            version_probe_timeout: non_zero(
                "startup.version_probe_timeout",
                &raw.startup.version_probe_timeout,
            )?,
            smoke_test: raw.startup.smoke_test,
            smoke_test_timeout: non_zero(
                "startup.smoke_test_timeout",
                &raw.startup.smoke_test_timeout,
            )?,
        };

        Ok(ConfigFile::new_unchecked(raw.worker, execution, startup))
    }
}

fn validate_worker(cfg: &RawConfigFile) -> Result<()> {
    if cfg.worker.names.is_empty() {
        return Err(ExecError::ConfigError(
            "[worker].names must list at least one executable name".to_string(),
        ));
    }
    if let Some(name) = cfg.worker.names.iter().find(|n| n.trim().is_empty()) {
        return Err(ExecError::ConfigError(format!(
            "[worker].names contains an empty entry ({name:?})"
        )));
    }
    if let Some(exe) = &cfg.worker.executable {
        if exe.as_os_str().is_empty() {
            return Err(ExecError::ConfigError(
                "[worker].executable must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| ExecError::ConfigError(format!("[{name}] invalid duration: {e}")))
}

fn non_zero(name: &str, value: &str) -> Result<Duration> {
    let dur = field(name, value)?;
    if dur.is_zero() {
        return Err(ExecError::ConfigError(format!(
            "[{name}] must be greater than zero (got {value:?})"
        )));
    }
    Ok(dur)
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
