// src/config/mod.rs

//! Configuration loading and validation for headless-exec.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and apply environment overrides
//!   (`loader.rs`).
//! - Validate values and convert them into typed settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    WORKER_ENV_VAR, apply_env_overrides, default_config_path, load_and_validate, load_from_path,
    load_or_default,
};
pub use model::{
    ConfigFile, ExecutionSection, RawConfigFile, RawExecutionSection, RawStartupSection,
    StartupSection, WorkerSection,
};
pub use validate::parse_duration;
