//! Shell-script stand-ins for the worker executable.
//!
//! Every fake worker understands the real command line
//! (`--background ... [file] --python <entry> --`), answers `--version`,
//! passes the startup smoke test, and appends one line per script run to
//! `invocations.log` next to itself, with its own pid in `worker.pid`. The correlation id is recovered from the
//! entry-script file name (`<id>.py`).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use headless_exec::locate::WorkerHandle;
use tempfile::TempDir;

#[derive(Debug, Clone)]
pub enum FakeWorkerKind {
    /// Prints START, a line of output, SUCCESS.
    Succeeds,
    /// Prints START and SUCCESS and exits 0 while a backgrounded grandchild
    /// (pid in `grandchild.pid`) keeps stdout open.
    SucceedsWithBackgroundChild,
    /// Executes the entry script with `python3`.
    Python,
    /// Prints START, then sleeps far past any test timeout.
    Hangs,
    /// Prints START, forks a long-lived grandchild (pid in `grandchild.pid`),
    /// then sleeps.
    HangsWithGrandchild,
    /// Writes to stderr and exits non-zero without ever printing START.
    CrashesBeforeStart,
    /// Exits 0 without printing START.
    SilentExit,
    /// Prints START, then ERROR and TRACEBACK lines, exits 1.
    RaisesError,
    /// Prints START and exits 0 without SUCCESS.
    NoSuccessMarker,
    /// Prints START and SUCCESS, then exits 1.
    SucceedsThenExitsNonZero,
    /// Prints the working-file argument (if any) after START.
    EchoesWorkingFile,
    /// Fails the smoke test but otherwise behaves like `Succeeds`.
    FailsSmokeTest,
    /// Custom body; `$id`, `$script`, `$file` and `$DIR` are in scope.
    Custom(String),
}

/// A fake worker executable in its own temp directory.
pub struct FakeWorker {
    dir: TempDir,
    path: PathBuf,
}

impl FakeWorker {
    pub fn new(kind: FakeWorkerKind) -> Self {
        Self::with_version(kind, "Blender 4.4.0")
    }

    pub fn with_version(kind: FakeWorkerKind, version_line: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix("fake_worker_")
            .tempdir()
            .expect("create fake worker dir");
        let path = dir.path().join("blender");
        let script = render(&kind, version_line, dir.path());
        write_executable(&path, &script);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn handle(&self) -> Arc<WorkerHandle> {
        Arc::new(WorkerHandle::new(&self.path, "Blender 4.4.0"))
    }

    /// Entry-script paths this worker was asked to run, in order.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("invocations.log"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Pid of the last worker process that ran a script.
    pub fn worker_pid(&self) -> Option<u32> {
        read_pid(&self.dir.path().join("worker.pid"))
    }

    /// Pid written by the kinds that fork a grandchild, once present.
    pub fn grandchild_pid(&self) -> Option<u32> {
        read_pid(&self.dir.path().join("grandchild.pid"))
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

fn render(kind: &FakeWorkerKind, version_line: &str, dir: &Path) -> String {
    let smoke = if matches!(kind, FakeWorkerKind::FailsSmokeTest) {
        r#"smoke_*) echo "smoke: refusing" >&2; exit 4 ;;"#
    } else {
        r#"smoke_*) echo "SMOKE_OK:$id"; exit 0 ;;"#
    };

    let body = match kind {
        FakeWorkerKind::Succeeds | FakeWorkerKind::FailsSmokeTest => {
            "echo \"START:$id\"\necho \"hello from fake worker\"\necho \"SUCCESS:$id\"\n".to_string()
        }
        FakeWorkerKind::SucceedsWithBackgroundChild => concat!(
            "sleep 30 &\n",
            "echo $! > \"$DIR/grandchild.pid\"\n",
            "echo \"START:$id\"\n",
            "echo \"SUCCESS:$id\"\n",
            "exit 0\n",
        )
        .to_string(),
        FakeWorkerKind::Python => "exec python3 \"$script\"\n".to_string(),
        FakeWorkerKind::Hangs => "echo \"START:$id\"\nsleep 60\n".to_string(),
        FakeWorkerKind::HangsWithGrandchild => concat!(
            "sleep 120 &\n",
            "echo $! > \"$DIR/grandchild.pid\"\n",
            "echo \"START:$id\"\n",
            "sleep 60\n",
        )
        .to_string(),
        FakeWorkerKind::CrashesBeforeStart => {
            "echo \"Error: could not initialise python\" >&2\nexit 3\n".to_string()
        }
        FakeWorkerKind::SilentExit => "echo \"worker banner\"\nexit 0\n".to_string(),
        FakeWorkerKind::RaisesError => concat!(
            "echo \"START:$id\"\n",
            "echo \"ERROR:$id - ZeroDivisionError: division by zero\"\n",
            "echo \"TRACEBACK:$id - Traceback (most recent call last):\"\n",
            "echo \"TRACEBACK:$id - ZeroDivisionError: division by zero\"\n",
            "exit 1\n",
        )
        .to_string(),
        FakeWorkerKind::NoSuccessMarker => "echo \"START:$id\"\nexit 0\n".to_string(),
        FakeWorkerKind::SucceedsThenExitsNonZero => {
            "echo \"START:$id\"\necho \"SUCCESS:$id\"\nexit 1\n".to_string()
        }
        FakeWorkerKind::EchoesWorkingFile => {
            "echo \"START:$id\"\necho \"file=$file\"\necho \"SUCCESS:$id\"\n".to_string()
        }
        FakeWorkerKind::Custom(body) => format!("{body}\n"),
    };

    format!(
        r#"#!/bin/sh
DIR="{dir}"
script=""
file=""
while [ $# -gt 0 ]; do
  case "$1" in
    --version) echo "{version_line}"; echo "built by fake worker"; exit 0 ;;
    --python) shift; script="$1" ;;
    --) break ;;
    --*) ;;
    *) file="$1" ;;
  esac
  shift
done
id=$(basename "$script" .py)
case "$id" in
  {smoke}
esac
echo $$ > "$DIR/worker.pid"
echo "$script" >> "$DIR/invocations.log"
{body}"#,
        dir = dir.display(),
    )
}

#[cfg(unix)]
fn write_executable(path: &Path, contents: &str) {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    {
        let mut file = fs::File::create(path).expect("create fake worker");
        file.write_all(contents.as_bytes()).expect("write fake worker");
        file.sync_all().expect("sync fake worker");
    }
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod fake worker");
}

#[cfg(not(unix))]
fn write_executable(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write fake worker");
}
