// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::parse_duration;

/// Command-line arguments for `headless-exec`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "headless-exec",
    version,
    about = "Run scripts inside a headless worker application with timeouts and retries.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `HeadlessExec.toml` in the current working directory if it
    /// exists, otherwise built-in defaults.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HEADLESS_EXEC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Locate and validate the worker executable, then print it as JSON.
    Locate {
        /// Skip the startup smoke test.
        #[arg(long)]
        no_smoke_test: bool,
    },

    /// Execute one script file and print the outcome as JSON.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Script to execute inside the worker.
    #[arg(value_name = "SCRIPT_FILE")]
    pub script: PathBuf,

    /// Working file opened by the worker before the script runs.
    #[arg(long, value_name = "PATH")]
    pub working_file: Option<PathBuf>,

    /// Per-attempt timeout, e.g. `30s` or `5m`.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Correlation id used for markers and entry-script naming.
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,

    /// Override `[execution].max_retries`.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Skip the startup smoke test.
    #[arg(long)]
    pub no_smoke_test: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
