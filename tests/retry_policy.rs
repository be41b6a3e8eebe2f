use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use headless_exec::errors::ExecError;
use headless_exec::retry::RetryPolicy;

fn timeout_err() -> ExecError {
    ExecError::Timeout {
        elapsed: Duration::from_millis(10),
        attempts: 1,
    }
}

#[test]
fn test_default_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.backoff, Duration::from_secs(2));
}

#[test]
fn test_only_timeouts_are_retryable() {
    let policy = RetryPolicy::new(3, Duration::ZERO);

    assert!(policy.should_retry(&timeout_err(), 0));
    assert!(policy.should_retry(&timeout_err(), 2));
    assert!(!policy.should_retry(&timeout_err(), 3));

    let script = ExecError::Script {
        message: "boom".into(),
        traceback: String::new(),
        script: None,
    };
    assert!(!policy.should_retry(&script, 0));
    assert!(!policy.should_retry(&ExecError::Validation("bad".into()), 0));
    let launch = ExecError::Launch {
        message: "no start".into(),
        stderr: String::new(),
        exit_code: Some(1),
    };
    assert!(!policy.should_retry(&launch, 0));
}

#[tokio::test]
async fn test_persistent_timeout_uses_whole_budget() {
    let policy = RetryPolicy::new(2, Duration::ZERO);
    let calls = AtomicU32::new(0);
    let mut seen = Vec::new();

    let attempted = policy
        .run(0, |retry| {
            calls.fetch_add(1, Ordering::SeqCst);
            seen.push(retry);
            async { Err::<(), _>(timeout_err()) }
        })
        .await;

    assert_eq!(attempted.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(seen, vec![0, 1, 2]);
    assert!(matches!(attempted.result, Err(ExecError::Timeout { .. })));
}

#[tokio::test]
async fn test_success_after_timeout_stops_retrying() {
    let policy = RetryPolicy::new(5, Duration::ZERO);

    let attempted = policy
        .run(0, |retry| async move {
            if retry == 0 {
                Err(timeout_err())
            } else {
                Ok(retry)
            }
        })
        .await;

    assert_eq!(attempted.attempts, 2);
    assert_eq!(attempted.result.unwrap(), 1);
}

#[tokio::test]
async fn test_non_retryable_error_returns_immediately() {
    let policy = RetryPolicy::new(5, Duration::from_secs(60));
    let started = Instant::now();

    let attempted = policy
        .run(0, |_| async { Err::<(), _>(ExecError::Validation("nope".into())) })
        .await;

    assert_eq!(attempted.attempts, 1);
    assert!(matches!(attempted.result, Err(ExecError::Validation(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_retries_already_used_count_against_budget() {
    let policy = RetryPolicy::new(3, Duration::ZERO);

    let attempted = policy
        .run(2, |_| async { Err::<(), _>(timeout_err()) })
        .await;

    assert_eq!(attempted.attempts, 2);
}

#[tokio::test]
async fn test_zero_retries_means_single_attempt() {
    let policy = RetryPolicy::new(0, Duration::ZERO);

    let attempted = policy
        .run(0, |_| async { Err::<(), _>(timeout_err()) })
        .await;

    assert_eq!(attempted.attempts, 1);
}

#[tokio::test]
async fn test_backoff_is_applied_between_attempts() {
    let policy = RetryPolicy::new(2, Duration::from_millis(50));
    let started = Instant::now();

    let attempted = policy
        .run(0, |_| async { Err::<(), _>(timeout_err()) })
        .await;

    assert_eq!(attempted.attempts, 3);
    assert!(started.elapsed() >= Duration::from_millis(100));
}
