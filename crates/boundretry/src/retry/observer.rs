//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring retry attempts
//! and a `TracingObserver` implementation that logs using the `tracing` crate.

use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::cancel::CancelCause;

/// Observer trait for retry events
///
/// Implement this trait to receive callbacks during retry execution.
/// This is useful for logging, metrics collection, or debugging.
///
/// `attempt` arguments are zero-based attempt indices; `attempts` arguments
/// count the attempts made so far.
///
/// # Example
///
/// ```rust
/// use boundretry::retry::RetryObserver;
/// use std::fmt::Display;
/// use std::time::Duration;
///
/// struct MetricsObserver {
///     // Your metrics client here
/// }
///
/// impl RetryObserver for MetricsObserver {
///     fn on_attempt_start(&self, attempt: u32, max_attempts: Option<u32>) {
///         // Record attempt start metric
///     }
///
///     fn on_retry_scheduled(&self, attempts: u32, error: &dyn Display, delay: Duration) {
///         // Record failure metric
///     }
///
///     fn on_success(&self, attempts: u32, total_duration: Duration) {
///         // Record success metric with latency
///     }
///
///     fn on_max_tries_exceeded(&self, attempts: u32, final_error: &dyn Display) {
///         // Record exhaustion metric
///     }
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called when an attempt is about to start
    ///
    /// `max_attempts` is `None` when the policy is unlimited.
    fn on_attempt_start(&self, attempt: u32, max_attempts: Option<u32>);

    /// Called when an attempt failed and the executor is about to wait `delay`
    fn on_retry_scheduled(&self, attempts: u32, error: &dyn Display, delay: Duration);

    /// Called when the operation succeeds
    fn on_success(&self, attempts: u32, total_duration: Duration);

    /// Called when the attempt budget is exhausted
    fn on_max_tries_exceeded(&self, attempts: u32, final_error: &dyn Display);

    /// Called when the predicate rejects an error
    fn on_unretryable(&self, attempts: u32, error: &dyn Display) {
        let _ = (attempts, error);
    }

    /// Called when the cancellation signal fires between attempts
    fn on_cancelled(&self, attempts: u32, cause: CancelCause) {
        let _ = (attempts, cause);
    }
}

/// A no-op observer that does nothing
///
/// Use this when you don't need observation but the API requires an observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: Option<u32>) {}

    fn on_retry_scheduled(&self, _attempts: u32, _error: &dyn Display, _delay: Duration) {}

    fn on_success(&self, _attempts: u32, _total_duration: Duration) {}

    fn on_max_tries_exceeded(&self, _attempts: u32, _final_error: &dyn Display) {}
}

/// An observer that logs retry events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_retry_scheduled`: WARN
/// - `on_success`: INFO (after retries) or DEBUG (first attempt)
/// - `on_max_tries_exceeded`: ERROR
/// - `on_unretryable`: WARN
/// - `on_cancelled`: WARN
///
/// # Example
///
/// ```rust
/// use boundretry::retry::TracingObserver;
///
/// // Create with operation name for better log context
/// let observer = TracingObserver::new("download");
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried (for log context)
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, max_attempts: Option<u32>) {
        tracing::debug!(
            operation = %self.operation,
            attempt = attempt,
            max_attempts = ?max_attempts,
            "starting attempt"
        );
    }

    fn on_retry_scheduled(&self, attempts: u32, error: &dyn Display, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempts = attempts,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, will retry"
        );
    }

    fn on_success(&self, attempts: u32, total_duration: Duration) {
        if attempts > 1 {
            tracing::info!(
                operation = %self.operation,
                attempts = attempts,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_max_tries_exceeded(&self, attempts: u32, final_error: &dyn Display) {
        tracing::error!(
            operation = %self.operation,
            attempts = attempts,
            error = %final_error,
            "all retry attempts exhausted"
        );
    }

    fn on_unretryable(&self, attempts: u32, error: &dyn Display) {
        tracing::warn!(
            operation = %self.operation,
            attempts = attempts,
            error = %error,
            "giving up on non-retryable error"
        );
    }

    fn on_cancelled(&self, attempts: u32, cause: CancelCause) {
        tracing::warn!(
            operation = %self.operation,
            attempts = attempts,
            cause = %cause,
            "retry cancelled while waiting"
        );
    }
}

/// An observer that counts retry events
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    attempt_starts: AtomicU32,
    retries: AtomicU32,
    successes: AtomicU32,
    max_tries: AtomicU32,
    unretryable: AtomicU32,
    cancellations: AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    /// Number of failed attempts that were followed by a wait
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries.load(Ordering::SeqCst)
    }

    pub fn unretryable(&self) -> u32 {
        self.unretryable.load(Ordering::SeqCst)
    }

    pub fn cancellations(&self) -> u32 {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: Option<u32>) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retry_scheduled(&self, _attempts: u32, _error: &dyn Display, _delay: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempts: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_max_tries_exceeded(&self, _attempts: u32, _final_error: &dyn Display) {
        self.max_tries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_unretryable(&self, _attempts: u32, _error: &dyn Display) {
        self.unretryable.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cancelled(&self, _attempts: u32, _cause: CancelCause) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: Option<u32>) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_retry_scheduled(&self, attempts: u32, error: &dyn Display, delay: Duration) {
        (**self).on_retry_scheduled(attempts, error, delay)
    }

    fn on_success(&self, attempts: u32, total_duration: Duration) {
        (**self).on_success(attempts, total_duration)
    }

    fn on_max_tries_exceeded(&self, attempts: u32, final_error: &dyn Display) {
        (**self).on_max_tries_exceeded(attempts, final_error)
    }

    fn on_unretryable(&self, attempts: u32, error: &dyn Display) {
        (**self).on_unretryable(attempts, error)
    }

    fn on_cancelled(&self, attempts: u32, cause: CancelCause) {
        (**self).on_cancelled(attempts, cause)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: Option<u32>) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_retry_scheduled(&self, attempts: u32, error: &dyn Display, delay: Duration) {
        (**self).on_retry_scheduled(attempts, error, delay)
    }

    fn on_success(&self, attempts: u32, total_duration: Duration) {
        (**self).on_success(attempts, total_duration)
    }

    fn on_max_tries_exceeded(&self, attempts: u32, final_error: &dyn Display) {
        (**self).on_max_tries_exceeded(attempts, final_error)
    }

    fn on_unretryable(&self, attempts: u32, error: &dyn Display) {
        (**self).on_unretryable(attempts, error)
    }

    fn on_cancelled(&self, attempts: u32, cause: CancelCause) {
        (**self).on_cancelled(attempts, cause)
    }
}
