//! End-to-end runs where the fake worker executes the entry script with a
//! real `python3`.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use headless_exec::errors::ExecError;
use headless_exec::retry::RetryPolicy;
use headless_exec::supervisor::{ExecutionRequest, Supervisor, SupervisorOptions};
use headless_exec::workspace::Workspace;
use headless_exec_test_utils::{
    FakeWorker, FakeWorkerKind, init_tracing, python3_available, with_timeout,
};

fn python_supervisor() -> Option<(FakeWorker, Supervisor)> {
    if !python3_available() {
        eprintln!("python3 not available; skipping");
        return None;
    }
    init_tracing();
    let fake = FakeWorker::new(FakeWorkerKind::Python);
    let options = SupervisorOptions {
        default_timeout: Duration::from_secs(15),
        kill_grace: Duration::from_secs(1),
        retry: RetryPolicy::new(0, Duration::ZERO),
        extra_args: Vec::new(),
    };
    let sup = Supervisor::new(fake.handle(), Arc::new(Workspace::open().unwrap()), options);
    Some((fake, sup))
}

#[tokio::test]
async fn test_print_succeeds_with_output() {
    let Some((_fake, sup)) = python_supervisor() else {
        return;
    };

    let out = with_timeout(sup.execute(ExecutionRequest::new("print('hello')")))
        .await
        .unwrap();

    assert!(out.success_marker);
    assert!(out.output.lines().any(|l| l == "hello"));
}

#[tokio::test]
async fn test_division_by_zero_is_script_error() {
    let Some((_fake, sup)) = python_supervisor() else {
        return;
    };

    let err = with_timeout(sup.execute(ExecutionRequest::new("x = 1/0")))
        .await
        .unwrap_err();

    match err {
        ExecError::Script {
            message,
            traceback,
            script,
        } => {
            assert_eq!(message, "ZeroDivisionError: division by zero");
            assert!(traceback.contains("ZeroDivisionError"));
            assert_eq!(script.as_deref(), Some("x = 1/0"));
        }
        other => panic!("expected Script error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_multiline_script_with_functions() {
    let Some((_fake, sup)) = python_supervisor() else {
        return;
    };
    let script = "import math\n\ndef area(r):\n    return math.pi * r * r\n\nprint(round(area(2), 2))\n";

    let out = with_timeout(sup.execute(ExecutionRequest::new(script)))
        .await
        .unwrap();

    assert!(out.output.lines().any(|l| l == "12.57"), "{}", out.output);
}

#[tokio::test]
async fn test_sys_exit_skips_success_marker() {
    let Some((_fake, sup)) = python_supervisor() else {
        return;
    };

    // SystemExit is not an Exception, so neither ERROR nor SUCCESS is printed.
    let out = with_timeout(sup.execute(ExecutionRequest::new("import sys\nsys.exit(0)")))
        .await
        .unwrap();

    assert!(!out.success_marker);
}

#[tokio::test]
async fn test_raise_after_output_reports_the_raise() {
    let Some((_fake, sup)) = python_supervisor() else {
        return;
    };

    let err = with_timeout(sup.execute(ExecutionRequest::new(
        "print('step 1')\nraise RuntimeError('step 2 failed')",
    )))
    .await
    .unwrap_err();

    assert!(
        matches!(&err, ExecError::Script { message, .. } if message == "RuntimeError: step 2 failed"),
        "{err:?}"
    );
}
