//! Integration tests for the retry executor
//!
//! These tests drive the public API end to end: configuration to policy,
//! policy to executor, and executor outcomes back to the caller.

use std::error::Error as StdError;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use boundretry::retry::{MessagePredicate, StatsObserver};
use boundretry::{
    retry_with_policy, CancelCause, CancelContext, CancelSignal, RetryConfig, RetryError,
    RetryErrorKind, RetryExecutorBuilder, RetryPoliciesConfig, RetryPolicy,
};

/// Cancels once the operation has been called a fixed number of times
struct AfterCalls {
    calls: Arc<AtomicU32>,
    limit: u32,
}

impl CancelSignal for AfterCalls {
    async fn wait(&self) -> CancelCause {
        if self.calls.load(Ordering::SeqCst) >= self.limit {
            CancelCause::Cancelled
        } else {
            std::future::pending().await
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_config_to_executor() {
    let config = RetryConfig::from_yaml_str(
        r#"
max-attempts: 4
base-delay-ms: 100
scale-factor: 1.0
max-delay-ms: 250
"#,
    )
    .unwrap();

    let calls = AtomicU32::new(0);
    let start = tokio::time::Instant::now();

    let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
        .with_policy(config.into())
        .build()
        .run(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(result.unwrap_err().kind(), RetryErrorKind::MaxTriesExceeded);

    // 100 + 200 + 250 (capped)
    assert!(start.elapsed() >= Duration::from_millis(550));
}

#[tokio::test]
async fn test_per_operation_policies() {
    let policies = RetryPoliciesConfig::from_yaml_str(
        r#"
default:
  max-attempts: 1
operations:
  fetch:
    max-attempts: 3
"#,
    )
    .unwrap();

    let attempts_for = |name: &str| {
        let policy = policies.policy_for(name);
        async move {
            let calls = AtomicU32::new(0);
            let _: Result<(), RetryError<io::Error>> = retry_with_policy(&policy, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(io::Error::other("boom")) }
            })
            .await;
            calls.load(Ordering::SeqCst)
        }
    };

    assert_eq!(attempts_for("fetch").await, 3);
    assert_eq!(attempts_for("publish").await, 1);
}

#[tokio::test]
async fn test_message_predicate_stops_on_permanent_error() {
    let observer = Arc::new(StatsObserver::new());

    let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
        .with_max_attempts(10)
        .with_predicate(MessagePredicate::network_errors())
        .with_observer(observer.clone())
        .with_timer(|_delay: Duration| std::future::ready(()))
        .build()
        .run(|attempt| async move {
            if attempt < 2 {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer"))
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "manifest not found"))
            }
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.is_unretryable());
    assert_eq!(err.attempts(), 3);
    assert_eq!(err.source_ref().kind(), io::ErrorKind::NotFound);
    assert_eq!(observer.retries(), 2);
}

#[tokio::test]
async fn test_error_chain_reaches_operation_error() {
    let result: Result<(), RetryError<io::Error>> =
        retry_with_policy(&RetryPolicy::fixed(2, Duration::ZERO), |_| async {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(
        err.to_string(),
        "reached maximum retries after 2 attempts: denied"
    );

    let source = err.source().unwrap();
    assert_eq!(source.to_string(), "denied");
    assert!(err.find_cause::<io::Error>().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_custom_cancel_signal() {
    let calls = Arc::new(AtomicU32::new(0));
    let signal = AfterCalls {
        calls: calls.clone(),
        limit: 3,
    };

    let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
        .with_max_attempts(-1)
        .with_base_delay(Duration::from_secs(3600))
        .build()
        .try_run(&signal, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(io::Error::other("unavailable")) }
        })
        .await;

    // the first two hour-long waits elapse; the third is cancelled
    assert_eq!(result.unwrap_err().cancel_cause(), Some(CancelCause::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_child_context_inherits_deadline() {
    let parent = CancelContext::new().with_timeout(Duration::from_millis(150));
    let child = parent.child();

    let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::fixed(-1, Duration::from_millis(100)))
        .build()
        .try_run(&child, |_| async { Err(io::Error::other("busy")) })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.cancel_cause(), Some(CancelCause::DeadlineExceeded));
    assert_eq!(err.attempts(), 2);
}
