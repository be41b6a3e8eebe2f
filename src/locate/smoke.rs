// src/locate/smoke.rs

//! Startup smoke test: one real headless invocation with a trivial script.

use std::time::Duration;

use tracing::{error, info};

use crate::errors::{ExecError, Result};
use crate::locate::WorkerHandle;
use crate::script::{CorrelationId, WrappedScript};
use crate::supervisor::command::WorkerCommand;
use crate::supervisor::process::{WorkerExit, run_worker};
use crate::workspace::Workspace;

const SMOKE_TAG: &str = "SMOKE_OK";

/// Run a minimal script through the worker and require its marker line.
///
/// Any failure here means the worker cannot execute entry scripts at all, so
/// it is reported as a launch error and should abort startup.
pub async fn smoke_test(
    worker: &WorkerHandle,
    workspace: &Workspace,
    timeout: Duration,
    kill_grace: Duration,
) -> Result<()> {
    let id = CorrelationId::with_prefix("smoke");
    let marker = format!("{SMOKE_TAG}:{id}");
    let script = WrappedScript {
        correlation_id: id.clone(),
        text: format!("import sys\nprint(\"{marker}\", flush=True)\nsys.exit(0)\n"),
    };

    let file = workspace
        .write_script(&script)
        .await
        .map_err(|e| ExecError::unexpected("writing smoke-test script", e))?;

    let cmd = WorkerCommand::new(worker.path(), file.path()).into_command(workspace.path());
    let exit = run_worker(cmd, timeout, kill_grace, &id)
        .await
        .map_err(|e| ExecError::unexpected("running smoke test", e));
    file.remove();

    let failure = |message: String, stderr: String, exit_code: Option<i32>| {
        error!(worker = %worker.path().display(), %message, "worker smoke test failed");
        ExecError::Launch {
            message: format!("startup smoke test failed: {message}"),
            stderr,
            exit_code,
        }
    };

    match exit? {
        WorkerExit::TimedOut { elapsed, .. } => Err(failure(
            format!("no exit within {:.1}s", elapsed.as_secs_f64()),
            String::new(),
            None,
        )),
        WorkerExit::Completed(run) if !run.status.success() => Err(failure(
            format!("worker exited with {}", run.status),
            run.stderr,
            run.status.code(),
        )),
        WorkerExit::Completed(run) if !run.stdout.lines().any(|l| l.trim_end() == marker) => {
            Err(failure(
                format!("marker {marker} missing from output"),
                run.stderr,
                run.status.code(),
            ))
        }
        WorkerExit::Completed(run) => {
            info!(
                worker = %worker.path().display(),
                elapsed_ms = run.elapsed.as_millis() as u64,
                "worker smoke test passed"
            );
            Ok(())
        }
    }
}
