// src/supervisor/mod.rs

//! Process supervisor: runs one entry script in one fresh worker process.
//!
//! Per attempt:
//!
//! ```text
//! Idle -> ScriptWritten -> Spawned -> Running -> Completed | TimedOut | CrashExited
//! ```
//!
//! - [`request`] holds the per-call request and success types.
//! - [`command`] builds the worker command line.
//! - [`process`] spawns the worker, drains its output and enforces the
//!   deadline.
//! - [`outcome`] maps a result into the caller-facing envelope.
//!
//! A [`Supervisor`] is constructed once and shared by reference (or `Arc`)
//! between callers. The only state shared between concurrent calls is the
//! read-only [`WorkerHandle`] and the workspace directory, whose file names
//! are keyed by correlation id.

pub mod command;
pub mod outcome;
pub mod process;
pub mod request;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::ConfigFile;
use crate::errors::{ExecError, Result};
use crate::locate::WorkerHandle;
use crate::output::{self, ParsedOutput};
use crate::retry::RetryPolicy;
use crate::script::{self, CorrelationId, Markers};
use crate::workspace::Workspace;

use self::command::WorkerCommand;
use self::process::{WorkerExit, run_worker};

pub use outcome::ExecutionOutcome;
pub use request::{ExecutionOutput, ExecutionRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ScriptWritten,
    Spawned,
    Completed,
    TimedOut,
    CrashExited,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::ScriptWritten => "script_written",
            Phase::Spawned => "spawned",
            Phase::Completed => "completed",
            Phase::TimedOut => "timed_out",
            Phase::CrashExited => "crash_exited",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub default_timeout: Duration,
    pub kill_grace: Duration,
    pub retry: RetryPolicy,
    pub extra_args: Vec<String>,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(300),
            kill_grace: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            extra_args: Vec::new(),
        }
    }
}

impl SupervisorOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            default_timeout: cfg.execution.timeout,
            kill_grace: cfg.execution.kill_grace,
            retry: RetryPolicy::new(cfg.execution.max_retries, cfg.execution.retry_backoff),
            extra_args: cfg.worker.extra_args.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Supervisor {
    worker: Arc<WorkerHandle>,
    workspace: Arc<Workspace>,
    options: SupervisorOptions,
    spawned: AtomicU32,
}

impl Supervisor {
    pub fn new(
        worker: Arc<WorkerHandle>,
        workspace: Arc<Workspace>,
        options: SupervisorOptions,
    ) -> Self {
        if !worker.is_valid() {
            warn!(
                worker = %worker.path().display(),
                "supervisor built with an unverified worker handle"
            );
        }
        Self {
            worker,
            workspace,
            options,
            spawned: AtomicU32::new(0),
        }
    }

    pub fn worker(&self) -> &WorkerHandle {
        &self.worker
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    /// Worker processes spawned by this supervisor so far.
    pub fn spawn_count(&self) -> u32 {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Run `request` to completion, retrying on timeout per the retry policy.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutput> {
        if request.script.trim().is_empty() {
            return Err(ExecError::Validation(
                "empty or whitespace-only script provided".to_string(),
            ));
        }

        let id = match request.correlation_id.as_deref() {
            Some(raw) => CorrelationId::parse(raw)?,
            None => CorrelationId::generate(),
        };
        let timeout = request.timeout.unwrap_or(self.options.default_timeout);
        if timeout.is_zero() {
            return Err(ExecError::Validation("timeout must be greater than zero".to_string()));
        }
        let working_file = resolve_working_file(request.working_file.as_deref(), &id);

        info!(
            correlation_id = %id,
            timeout_ms = timeout.as_millis() as u64,
            working_file = ?working_file,
            "executing script"
        );

        let started = Instant::now();
        let req = &request;
        let id_ref = &id;
        let wf = working_file.as_deref();
        let attempted = self
            .options
            .retry
            .run(request.retry_count, move |retry| {
                self.attempt(req, id_ref, wf, timeout, retry)
            })
            .await;
        let elapsed = started.elapsed();

        match attempted.result {
            Ok(parsed) => {
                info!(
                    correlation_id = %id,
                    attempts = attempted.attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "script completed"
                );
                Ok(ExecutionOutput {
                    correlation_id: id,
                    output: parsed.output,
                    success_marker: parsed.success_marker,
                    attempts: attempted.attempts,
                    elapsed,
                })
            }
            Err(ExecError::Timeout { .. }) => {
                error!(
                    correlation_id = %id,
                    attempts = attempted.attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "script timed out on every attempt"
                );
                Err(ExecError::Timeout {
                    elapsed,
                    attempts: attempted.attempts,
                })
            }
            Err(ExecError::Script {
                message, traceback, ..
            }) => {
                error!(correlation_id = %id, message = %message, "script raised");
                Err(ExecError::Script {
                    message,
                    traceback,
                    script: Some(request.script.clone()),
                })
            }
            Err(err) => {
                error!(correlation_id = %id, error = %err, "script execution failed");
                Err(err)
            }
        }
    }

    /// One full pass through the pipeline. The entry-script file is removed
    /// on every return path by the [`crate::workspace::ScriptFile`] guard.
    async fn attempt(
        &self,
        request: &ExecutionRequest,
        id: &CorrelationId,
        working_file: Option<&Path>,
        timeout: Duration,
        retry: u32,
    ) -> Result<ParsedOutput> {
        let wrapped = script::wrap(&request.script, id);
        let script_file = self
            .workspace
            .write_script(&wrapped)
            .await
            .map_err(|e| ExecError::unexpected("writing entry script", e))?;
        trace_phase(id, retry, Phase::ScriptWritten);

        let worker_cmd = WorkerCommand::new(self.worker.path(), script_file.path())
            .extra_args(&self.options.extra_args)
            .working_file(working_file);
        debug!(correlation_id = %id, command = %worker_cmd.display(), "worker command");
        let cmd = worker_cmd.into_command(self.workspace.path());

        self.spawned.fetch_add(1, Ordering::SeqCst);
        trace_phase(id, retry, Phase::Spawned);
        let exit = run_worker(cmd, timeout, self.options.kill_grace, id)
            .await
            .map_err(|e| ExecError::unexpected("running worker process", e));
        script_file.remove();

        match exit? {
            WorkerExit::TimedOut { elapsed, .. } => {
                trace_phase(id, retry, Phase::TimedOut);
                Err(ExecError::Timeout {
                    elapsed,
                    attempts: 1,
                })
            }
            WorkerExit::Completed(run) => {
                if !run.status.success() {
                    trace_phase(id, retry, Phase::CrashExited);
                    if !Markers::for_id(id).has_start(&run.stdout) {
                        return Err(ExecError::Launch {
                            message: format!(
                                "worker exited with {} before the entry script started",
                                run.status
                            ),
                            stderr: run.stderr,
                            exit_code: run.status.code(),
                        });
                    }
                } else {
                    trace_phase(id, retry, Phase::Completed);
                }
                output::parse(&run.stdout, &run.stderr, id)
            }
        }
    }
}

fn trace_phase(id: &CorrelationId, retry: u32, phase: Phase) {
    debug!(correlation_id = %id, retry, phase = %phase, "attempt transition");
}

/// Keep the working file only when it exists; otherwise the worker runs on
/// factory startup.
fn resolve_working_file(path: Option<&Path>, id: &CorrelationId) -> Option<PathBuf> {
    let path = path?;
    if path.exists() {
        Some(path.to_path_buf())
    } else {
        warn!(
            correlation_id = %id,
            path = %path.display(),
            "working file not found; running on factory startup"
        );
        None
    }
}
