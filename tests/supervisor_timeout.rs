#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_exec::errors::ExecError;
use headless_exec::process_tree::is_alive;
use headless_exec::retry::RetryPolicy;
use headless_exec::supervisor::{ExecutionRequest, Supervisor, SupervisorOptions};
use headless_exec::workspace::Workspace;
use headless_exec_test_utils::{FakeWorker, FakeWorkerKind, init_tracing, with_timeout};

fn supervisor(fake: &FakeWorker, retries: u32, backoff: Duration) -> Supervisor {
    supervisor_with_grace(fake, retries, backoff, Duration::from_secs(2))
}

fn supervisor_with_grace(
    fake: &FakeWorker,
    retries: u32,
    backoff: Duration,
    kill_grace: Duration,
) -> Supervisor {
    let options = SupervisorOptions {
        default_timeout: Duration::from_millis(300),
        kill_grace,
        retry: RetryPolicy::new(retries, backoff),
        extra_args: Vec::new(),
    };
    Supervisor::new(fake.handle(), Arc::new(Workspace::open().unwrap()), options)
}

async fn wait_until_dead(pid: u32) -> bool {
    for _ in 0..50 {
        if !is_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn test_hanging_script_is_retried_then_times_out() {
    init_tracing();
    let fake = FakeWorker::new(FakeWorkerKind::Hangs);
    let sup = supervisor(&fake, 2, Duration::from_millis(50));
    let started = Instant::now();

    let err = with_timeout(sup.execute(ExecutionRequest::new("while True: pass")))
        .await
        .unwrap_err();

    match err {
        ExecError::Timeout { elapsed, attempts } => {
            assert_eq!(attempts, 3);
            assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(sup.spawn_count(), 3);

    // Every attempt reuses the same id and therefore the same file name.
    let invoked = fake.invocations();
    assert_eq!(invoked.len(), 3);
    assert!(invoked.iter().all(|p| p == &invoked[0]));
    assert!(!std::path::Path::new(&invoked[0]).exists());
}

#[tokio::test]
async fn test_timeout_without_retries_is_single_attempt() {
    init_tracing();
    let fake = FakeWorker::new(FakeWorkerKind::Hangs);
    let sup = supervisor(&fake, 0, Duration::ZERO);

    let err = with_timeout(sup.execute(ExecutionRequest::new("pass")))
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Timeout { attempts: 1, .. }), "{err:?}");
    assert_eq!(sup.spawn_count(), 1);
}

#[tokio::test]
async fn test_per_request_timeout_overrides_default() {
    init_tracing();
    let fake = FakeWorker::new(FakeWorkerKind::Hangs);
    let sup = supervisor(&fake, 0, Duration::ZERO);
    let started = Instant::now();

    let err = with_timeout(
        sup.execute(ExecutionRequest::new("pass").timeout(Duration::from_millis(100))),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ExecError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_timeout_kills_grandchildren() {
    init_tracing();
    let fake = FakeWorker::new(FakeWorkerKind::HangsWithGrandchild);
    let sup = supervisor(&fake, 0, Duration::ZERO);

    let err = with_timeout(sup.execute(ExecutionRequest::new("pass")))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::Timeout { .. }));

    let worker = fake.worker_pid().expect("fake worker recorded its pid");
    let grandchild = fake.grandchild_pid().expect("fake worker recorded its grandchild");
    assert!(
        wait_until_dead(worker).await,
        "worker {worker} survived the tree kill"
    );
    assert!(
        wait_until_dead(grandchild).await,
        "grandchild {grandchild} survived the tree kill"
    );
}

#[tokio::test]
async fn test_exit_is_completed_even_while_background_child_holds_output() {
    init_tracing();
    let fake = FakeWorker::new(FakeWorkerKind::SucceedsWithBackgroundChild);
    let sup = supervisor_with_grace(&fake, 2, Duration::ZERO, Duration::from_millis(200));
    let started = Instant::now();

    let out = with_timeout(
        sup.execute(ExecutionRequest::new("pass").timeout(Duration::from_secs(2))),
    )
    .await
    .unwrap();

    assert!(out.success_marker);
    assert!(out.output.contains(&format!("SUCCESS:{}", out.correlation_id)));
    assert_eq!(out.attempts, 1);
    assert_eq!(sup.spawn_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());

    let grandchild = fake.grandchild_pid().expect("fake worker recorded its grandchild");
    assert!(
        wait_until_dead(grandchild).await,
        "background child {grandchild} was left running"
    );
}
