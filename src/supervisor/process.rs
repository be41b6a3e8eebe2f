// src/supervisor/process.rs

//! One worker process, from spawn to reaped exit.
//!
//! stdout and stderr are drained by their own tasks while the supervisor
//! waits for the worker to exit; draining them one after the other can
//! deadlock once the unread pipe fills up. The deadline applies to the
//! worker's exit only. Background children that inherited the pipes can keep
//! them open after the worker is gone, so once it exits the drains get
//! `kill_grace` to reach EOF, after which leftover processes are killed and
//! whatever was captured is used.
//! When the deadline passes first, the whole process tree is killed and the
//! worker is reaped within a bounded grace period.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::process_tree::{kill_orphans, kill_process_tree};
use crate::script::CorrelationId;

#[derive(Debug)]
pub struct CompletedRun {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum WorkerExit {
    Completed(CompletedRun),
    TimedOut { elapsed: Duration, pid: Option<u32> },
}

pub async fn run_worker(
    mut cmd: Command,
    timeout: Duration,
    kill_grace: Duration,
    id: &CorrelationId,
) -> Result<WorkerExit> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let started = Instant::now();
    let mut child = cmd.spawn().context("spawning worker process")?;
    let pid = child.id();
    debug!(correlation_id = %id, pid = ?pid, "worker process spawned");

    let mut stdout = Capture::spawn(child.stdout.take().context("worker stdout was not piped")?);
    let mut stderr = Capture::spawn(child.stderr.take().context("worker stderr was not piped")?);

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => status.context("waiting for worker process")?,
        Err(_) => {
            warn!(
                correlation_id = %id,
                pid = ?pid,
                timeout_ms = timeout.as_millis() as u64,
                "worker deadline exceeded; killing process tree"
            );
            terminate(&mut child, pid, kill_grace, id).await;
            stdout.abort();
            stderr.abort();
            return Ok(WorkerExit::TimedOut {
                elapsed: started.elapsed(),
                pid,
            });
        }
    };
    let elapsed = started.elapsed();

    if !finish_captures(&mut stdout, &mut stderr, kill_grace, id).await {
        warn!(
            correlation_id = %id,
            pid = ?pid,
            grace_ms = kill_grace.as_millis() as u64,
            "worker exited but its output pipes are still open; killing leftover processes"
        );
        if let Some(pid) = pid {
            kill_orphans(pid);
        }
        if !finish_captures(&mut stdout, &mut stderr, kill_grace, id).await {
            warn!(correlation_id = %id, pid = ?pid, "output pipes still open; using partial output");
        }
    }
    stdout.abort();
    stderr.abort();
    let stdout = stdout.text();
    let stderr = stderr.text();

    info!(
        correlation_id = %id,
        pid = ?pid,
        exit_code = ?status.code(),
        elapsed_ms = elapsed.as_millis() as u64,
        "worker process exited"
    );
    log_stream(id, "stdout", &stdout);
    log_stream(id, "stderr", &stderr);

    Ok(WorkerExit::Completed(CompletedRun {
        status,
        stdout,
        stderr,
        elapsed,
    }))
}

/// One output stream read into a shared buffer by a background task, so the
/// bytes read so far survive if the task has to be abandoned.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<std::io::Result<()>>,
    done: bool,
}

impl Capture {
    fn spawn<R: AsyncRead + Unpin + Send + 'static>(reader: R) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(read_into(reader, Arc::clone(&buf)));
        Self {
            buf,
            task,
            done: false,
        }
    }

    /// Wait for EOF. Read errors are logged; the bytes read so far are kept.
    async fn finish(&mut self, id: &CorrelationId) {
        if self.done {
            return;
        }
        match (&mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(correlation_id = %id, error = %e, "error reading worker output"),
            Err(e) => warn!(correlation_id = %id, error = %e, "worker output task failed"),
        }
        self.done = true;
    }

    fn abort(&self) {
        if !self.done {
            self.task.abort();
        }
    }

    fn text(&self) -> String {
        let buf = match self.buf.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        String::from_utf8_lossy(&buf).into_owned()
    }
}

async fn read_into<R: AsyncRead + Unpin>(
    mut reader: R,
    buf: Arc<Mutex<Vec<u8>>>,
) -> std::io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        match buf.lock() {
            Ok(mut guard) => guard.extend_from_slice(&chunk[..n]),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(&chunk[..n]),
        }
    }
}

/// True when both streams reached EOF within `grace`.
async fn finish_captures(
    stdout: &mut Capture,
    stderr: &mut Capture,
    grace: Duration,
    id: &CorrelationId,
) -> bool {
    tokio::time::timeout(grace, async {
        tokio::join!(stdout.finish(id), stderr.finish(id));
    })
    .await
    .is_ok()
}

/// Kill descendants and the worker, then reap it. Failures are logged only.
async fn terminate(child: &mut Child, pid: Option<u32>, grace: Duration, id: &CorrelationId) {
    if let Some(pid) = pid {
        let report = kill_process_tree(pid);
        debug!(
            correlation_id = %id,
            pid,
            descendants = report.descendants.len(),
            failed = report.failed.len(),
            "process tree kill issued"
        );
    }

    // The group kill usually got the worker already.
    if let Ok(Some(status)) = child.try_wait() {
        debug!(correlation_id = %id, pid = ?pid, status = %status, "killed worker reaped");
        return;
    }
    if let Err(e) = child.start_kill() {
        warn!(correlation_id = %id, pid = ?pid, error = %e, "failed to kill worker process");
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(correlation_id = %id, pid = ?pid, status = %status, "killed worker reaped");
        }
        Ok(Err(e)) => {
            warn!(correlation_id = %id, pid = ?pid, error = %e, "error waiting for killed worker");
        }
        Err(_) => {
            warn!(
                correlation_id = %id,
                pid = ?pid,
                grace_ms = grace.as_millis() as u64,
                "killed worker did not exit within grace period"
            );
        }
    }
}

fn log_stream(id: &CorrelationId, stream: &'static str, text: &str) {
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        debug!(correlation_id = %id, stream, "{}", line);
    }
}
