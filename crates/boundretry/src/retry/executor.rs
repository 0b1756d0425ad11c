//! Retry execution engine
//!
//! This module provides the attempt loop with a configurable policy,
//! predicate, observer, timer, and random source.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::cancel::{CancelSignal, NeverCancel};
use super::error::RetryError;
use super::observer::{NoOpObserver, RetryObserver};
use super::policy::RetryPolicy;
use super::sources::{RandomSource, ThreadRandom, Timer, TokioTimer};
use super::strategies::{apply_jitter, scaled_delay, AlwaysRetry, RetryPredicate};

/// Execute an async operation with retry logic based on a policy
///
/// Uses the default collaborators: every error is retryable, waits use the
/// tokio clock, jitter uses the thread-local RNG, and nothing cancels the run.
///
/// # Example
///
/// ```rust,no_run
/// use boundretry::{retry_with_policy, RetryPolicy};
/// use std::time::Duration;
///
/// async fn example() {
///     let policy = RetryPolicy::fixed(3, Duration::from_millis(100));
///
///     let result = retry_with_policy(&policy, |attempt| async move {
///         // Simulated operation that might fail
///         if attempt < 1 {
///             Err(std::io::Error::other("flaky"))
///         } else {
///             Ok("success")
///         }
///     })
///     .await;
/// }
/// ```
pub async fn retry_with_policy<F, Fut, T, E>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryExecutorBuilder::new()
        .with_policy(policy.clone())
        .build()
        .run(op)
        .await
}

/// Builder for configuring a `RetryExecutor`
///
/// # Example
///
/// ```rust
/// use boundretry::retry::{ClosurePredicate, RetryExecutorBuilder, TracingObserver};
/// use std::time::Duration;
///
/// let executor = RetryExecutorBuilder::new()
///     .with_max_attempts(5)
///     .with_base_delay(Duration::from_millis(100))
///     .with_jitter(Duration::from_millis(50))
///     .with_scale_factor(0.5)
///     .with_predicate(ClosurePredicate::new(|err: &std::io::Error| {
///         err.kind() != std::io::ErrorKind::NotFound
///     }))
///     .with_observer(TracingObserver::new("download"))
///     .build();
/// ```
pub struct RetryExecutorBuilder<
    P = AlwaysRetry,
    O = NoOpObserver,
    T = TokioTimer,
    R = ThreadRandom,
> {
    policy: RetryPolicy,
    predicate: P,
    observer: O,
    timer: T,
    random: R,
}

impl Default for RetryExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutorBuilder {
    /// Create a new builder with default settings
    ///
    /// The default policy makes exactly one attempt.
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            predicate: AlwaysRetry,
            observer: NoOpObserver,
            timer: TokioTimer,
            random: ThreadRandom,
        }
    }
}

impl<P, O, T, R> RetryExecutorBuilder<P, O, T, R> {
    /// Set the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.policy.base_delay = base_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.policy.jitter = jitter;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.policy.scale_factor = scale_factor;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.policy.max_delay = max_delay;
        self
    }

    /// Set the retry predicate
    ///
    /// The predicate determines whether an error should be retried.
    pub fn with_predicate<P2>(self, predicate: P2) -> RetryExecutorBuilder<P2, O, T, R> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate,
            observer: self.observer,
            timer: self.timer,
            random: self.random,
        }
    }

    /// Set the observer
    ///
    /// The observer receives callbacks during retry execution.
    pub fn with_observer<O2>(self, observer: O2) -> RetryExecutorBuilder<P, O2, T, R> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate: self.predicate,
            observer,
            timer: self.timer,
            random: self.random,
        }
    }

    /// Replace the wall-clock timer used between attempts
    pub fn with_timer<T2>(self, timer: T2) -> RetryExecutorBuilder<P, O, T2, R> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate: self.predicate,
            observer: self.observer,
            timer,
            random: self.random,
        }
    }

    /// Replace the random source used for jitter
    pub fn with_random_source<R2>(self, random: R2) -> RetryExecutorBuilder<P, O, T, R2> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate: self.predicate,
            observer: self.observer,
            timer: self.timer,
            random,
        }
    }

    /// Build the executor
    pub fn build(self) -> RetryExecutor<P, O, T, R> {
        RetryExecutor {
            policy: self.policy,
            predicate: self.predicate,
            observer: self.observer,
            timer: self.timer,
            random: self.random,
        }
    }
}

/// A retry executor with configurable policy and collaborators
///
/// Use `RetryExecutorBuilder` to create an instance. The executor is never
/// mutated by a run, so one instance can serve many concurrent runs.
pub struct RetryExecutor<P = AlwaysRetry, O = NoOpObserver, T = TokioTimer, R = ThreadRandom> {
    policy: RetryPolicy,
    predicate: P,
    observer: O,
    timer: T,
    random: R,
}

impl<P, O, T, R> RetryExecutor<P, O, T, R> {
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<P, O, T, R> RetryExecutor<P, O, T, R>
where
    O: RetryObserver,
    T: Timer,
    R: RandomSource,
{
    /// Run `op` until it succeeds or a terminal failure occurs, ignoring cancellation
    pub async fn run<F, Fut, V, E>(&self, op: F) -> Result<V, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
        P: RetryPredicate<E>,
    {
        self.try_run(&NeverCancel, op).await
    }

    /// Run `op` one or more times
    ///
    /// The zero-based attempt index is passed to `op`. The loop stops when:
    /// - `op` succeeds: its value is returned
    /// - the attempt budget is spent: [`RetryError::MaxTriesExceeded`]
    /// - the predicate rejects the error: [`RetryError::Unretryable`]
    /// - `cancel` has fired, or fires while waiting between attempts:
    ///   [`RetryError::Cancelled`]
    ///
    /// The budget is checked before the predicate. Cancellation is only
    /// observed between attempts; a running attempt is never interrupted.
    /// An unlimited policy still stops after `u32::MAX` attempts, so the
    /// attempt index never repeats.
    pub async fn try_run<C, F, Fut, V, E>(&self, cancel: &C, mut op: F) -> Result<V, RetryError<E>>
    where
        C: CancelSignal,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
        P: RetryPredicate<E>,
    {
        let start = Instant::now();
        let budget = self.policy.attempt_budget();
        let mut attempt: u32 = 0;

        loop {
            self.observer.on_attempt_start(attempt, budget);

            let err = match op(attempt).await {
                Ok(value) => {
                    self.observer
                        .on_success(attempt + 1, start.elapsed());
                    return Ok(value);
                }
                Err(err) => err,
            };

            // allows_another caps the index below u32::MAX
            attempt += 1;

            if !self.policy.allows_another(attempt) {
                self.observer.on_max_tries_exceeded(attempt, &err);
                return Err(RetryError::max_tries_exceeded(attempt, err));
            }

            if !self.predicate.should_retry(&err) {
                self.observer.on_unretryable(attempt, &err);
                return Err(RetryError::unretryable(attempt, err));
            }

            // A signal that fired before the wait always stops the run, even
            // when the timer would complete on its first poll.
            tokio::select! {
                biased;
                cause = cancel.wait() => {
                    self.observer.on_cancelled(attempt, cause);
                    return Err(RetryError::cancelled(attempt, cause, err));
                }
                () = std::future::ready(()) => {}
            }

            let delay = self.next_delay(attempt);
            self.observer.on_retry_scheduled(attempt, &err, delay);

            // Timer first: a cancellation arriving after the delay elapsed must
            // not win the race.
            tokio::select! {
                biased;
                () = self.timer.after(delay) => {}
                cause = cancel.wait() => {
                    self.observer.on_cancelled(attempt, cause);
                    return Err(RetryError::cancelled(attempt, cause, err));
                }
            }
        }
    }

    /// Delay after `attempts` failures; the random source is only consulted
    /// when there is jitter to apply
    fn next_delay(&self, attempts: u32) -> Duration {
        let delay = scaled_delay(&self.policy, attempts);
        if self.policy.jitter.min(delay).is_zero() {
            return delay;
        }
        apply_jitter(delay, self.policy.jitter, self.random.next_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::observer::StatsObserver;
    use crate::retry::strategies::ClosurePredicate;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn instant_timer() -> impl Fn(Duration) -> std::future::Ready<()> + Send + Sync {
        |_delay| std::future::ready(())
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let observer = Arc::new(StatsObserver::new());

        let result: Result<&str, RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_max_attempts(3)
            .with_observer(observer.clone())
            .build()
            .run(|_| async { Ok("success") })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(observer.attempt_starts(), 1);
        assert_eq!(observer.successes(), 1);
        assert_eq!(observer.retries(), 0);
    }

    #[tokio::test]
    async fn test_success_after_retry() {
        let observer = Arc::new(StatsObserver::new());

        let result: Result<u32, RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(10))
            .with_timer(instant_timer())
            .with_observer(observer.clone())
            .build()
            .run(|attempt| async move {
                if attempt < 1 {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"))
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(observer.attempt_starts(), 2);
        assert_eq!(observer.retries(), 1);
        assert_eq!(observer.successes(), 1);
    }

    #[tokio::test]
    async fn test_all_attempts_exhausted() {
        let observer = Arc::new(StatsObserver::new());

        let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_max_attempts(3)
            .with_timer(instant_timer())
            .with_observer(observer.clone())
            .build()
            .run(|_| async { Err(io::Error::new(io::ErrorKind::TimedOut, "always fails")) })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_max_tries_exceeded());
        assert_eq!(err.attempts(), 3);
        assert_eq!(observer.attempt_starts(), 3);
        assert_eq!(observer.retries(), 2); // no wait after the last attempt
        assert_eq!(observer.max_tries(), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_error() {
        let observer = Arc::new(StatsObserver::new());

        let predicate = ClosurePredicate::new(|err: &io::Error| {
            // Don't retry NotFound errors
            err.kind() != io::ErrorKind::NotFound
        });

        let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_max_attempts(5)
            .with_predicate(predicate)
            .with_observer(observer.clone())
            .build()
            .run(|_| async { Err(io::Error::new(io::ErrorKind::NotFound, "not found")) })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_unretryable());
        assert_eq!(err.attempts(), 1);
        assert_eq!(observer.attempt_starts(), 1);
        assert_eq!(observer.retries(), 0);
        assert_eq!(observer.unretryable(), 1);
    }

    #[tokio::test]
    async fn test_budget_checked_before_predicate() {
        let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_max_attempts(1)
            .with_predicate(crate::retry::strategies::NeverRetry)
            .build()
            .run(|_| async { Err(io::Error::other("boom")) })
            .await;

        assert!(result.unwrap_err().is_max_tries_exceeded());
    }

    #[tokio::test]
    async fn test_retry_with_policy_convenience() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let result = retry_with_policy(&policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 1 {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"))
                } else {
                    Ok("success")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_max_attempts_runs_once() {
        let calls = AtomicU32::new(0);

        let result: Result<(), RetryError<io::Error>> =
            retry_with_policy(&RetryPolicy::default(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(io::Error::other("error")) }
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_max_tries_exceeded());
        assert_eq!(err.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timer_sees_computed_delays() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let randoms = Mutex::new(vec![0.2, 0.9, 0.1]);

        let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_max_attempts(4)
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(Duration::from_millis(50))
            .with_scale_factor(0.5)
            .with_timer(move |delay: Duration| {
                recorder.lock().unwrap().push(delay);
                std::future::ready(())
            })
            .with_random_source(move || randoms.lock().unwrap().pop().unwrap_or(0.5))
            .build()
            .run(|_| async { Err(io::Error::other("nope")) })
            .await;

        assert!(result.unwrap_err().is_max_tries_exceeded());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Duration::from_millis(60),
                Duration::from_millis(190),
                Duration::from_millis(195),
            ]
        );
    }

    #[tokio::test]
    async fn test_random_source_unused_without_jitter() {
        let draws = Arc::new(AtomicU32::new(0));
        let counter = draws.clone();

        let _: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(5))
            .with_timer(instant_timer())
            .with_random_source(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                0.5
            })
            .build()
            .run(|_| async { Err(io::Error::other("nope")) })
            .await;

        assert_eq!(draws.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timer_waits_between_attempts() {
        let start = Instant::now();

        let result: Result<(), RetryError<io::Error>> = RetryExecutorBuilder::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(100))
            .with_scale_factor(1.0)
            .build()
            .run(|_| async { Err(io::Error::other("nope")) })
            .await;

        assert!(result.is_err());
        // 100ms + 200ms
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
