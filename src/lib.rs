// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod locate;
pub mod logging;
pub mod output;
pub mod process_tree;
pub mod retry;
pub mod script;
pub mod supervisor;
pub mod workspace;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::{ConfigFile, load_or_default};
use crate::locate::{WorkerLocator, smoke_test};
use crate::supervisor::{ExecutionOutcome, ExecutionRequest, Supervisor, SupervisorOptions};
use crate::workspace::Workspace;

/// Startup sequence shared by the CLI and library callers:
/// locate the worker, open the workspace, optionally smoke-test, and build
/// the supervisor that every call then goes through.
pub async fn initialize(cfg: &ConfigFile, smoke: bool) -> errors::Result<Supervisor> {
    let worker = WorkerLocator::from_config(cfg).locate().await?;
    let workspace = Workspace::open()
        .map_err(|e| errors::ExecError::unexpected("opening workspace", e))?;

    if smoke {
        if let Err(err) = smoke_test(
            &worker,
            &workspace,
            cfg.startup.smoke_test_timeout,
            cfg.execution.kill_grace,
        )
        .await
        {
            workspace.close();
            return Err(err);
        }
    }

    Ok(Supervisor::new(
        Arc::new(worker),
        Arc::new(workspace),
        SupervisorOptions::from_config(cfg),
    ))
}

/// High-level entry point used by `main.rs`.
///
/// Returns `Ok(false)` when the requested operation ran but did not succeed
/// (the outcome has already been printed).
pub async fn run(args: CliArgs) -> Result<bool> {
    let mut cfg = load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Locate { no_smoke_test } => {
            let smoke = cfg.startup.smoke_test && !no_smoke_test;
            let supervisor = initialize(&cfg, smoke).await?;
            print_json(supervisor.worker())?;
            supervisor.workspace().close();
            Ok(true)
        }
        Command::Run(run_args) => {
            if let Some(max_retries) = run_args.max_retries {
                cfg.execution.max_retries = max_retries;
            }
            let smoke = cfg.startup.smoke_test && !run_args.no_smoke_test;
            let supervisor = initialize(&cfg, smoke).await?;
            let outcome = run_script(&supervisor, &run_args).await;
            supervisor.workspace().close();
            let outcome = outcome?;
            print_json(&outcome)?;
            Ok(outcome.is_success())
        }
    }
}

async fn run_script(supervisor: &Supervisor, args: &RunArgs) -> Result<ExecutionOutcome> {
    let script = tokio::fs::read_to_string(&args.script)
        .await
        .with_context(|| format!("reading script file {:?}", args.script))?;

    let mut request = ExecutionRequest::new(script);
    if let Some(path) = &args.working_file {
        request = request.working_file(path);
    }
    if let Some(timeout) = args.timeout {
        request = request.timeout(timeout);
    }
    if let Some(id) = &args.id {
        request = request.correlation_id(id.clone());
    }

    info!(
        script = %args.script.display(),
        worker = %supervisor.worker().path().display(),
        "running script file"
    );
    let outcome = ExecutionOutcome::from(supervisor.execute(request).await);
    if !outcome.is_success() {
        warn!(script = %args.script.display(), "script execution failed");
    }
    Ok(outcome)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{text}");
    Ok(())
}
