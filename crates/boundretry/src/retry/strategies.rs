//! Delay calculation and retryability predicates
//!
//! The delay before attempt `n + 1` (after `n` attempts have failed) is:
//!
//! ```text
//! scaled = base_delay * (1 + scale_factor)^(n - 1)
//! capped = min(scaled, max_delay)            // only when max_delay > 0
//! jitter = min(jitter, capped)
//! delay  = capped + jitter * (2r - 1)        // r in [0, 1)
//! ```
//!
//! The ceiling applies before jitter, so the final wait may land slightly
//! above `max_delay`. Jitter is clamped to the delay, so the result is never
//! negative.

use std::error::Error;
use std::time::Duration;

use super::policy::RetryPolicy;

/// Calculate the delay to wait after `attempt` failed attempts
///
/// A pure function of its inputs; `random` is expected in `[0, 1)`.
///
/// # Example
///
/// ```rust
/// use boundretry::{calculate_delay, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential(5, Duration::from_millis(100), 0.5)
///     .with_jitter(Duration::from_millis(50));
///
/// // r = 0.5 adds no jitter
/// assert_eq!(calculate_delay(&policy, 1, 0.5), Duration::from_millis(100));
/// assert_eq!(calculate_delay(&policy, 2, 0.5), Duration::from_millis(150));
///
/// // r = 0.1 subtracts 80% of the jitter
/// assert_eq!(calculate_delay(&policy, 1, 0.1), Duration::from_millis(60));
/// ```
pub fn calculate_delay(policy: &RetryPolicy, attempt: u32, random: f64) -> Duration {
    apply_jitter(scaled_delay(policy, attempt), policy.jitter, random)
}

/// The delay after `attempt` failed attempts, with backoff and ceiling but no jitter
pub fn scaled_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let mut delay = policy.base_delay;

    if policy.scale_factor.is_finite() && policy.scale_factor > 0.0 {
        let exponent = attempt.saturating_sub(1) as f64;
        let scale = (1.0 + policy.scale_factor).powf(exponent);
        delay = nanos_to_duration(delay.as_nanos() as f64 * scale);
    }

    if !policy.max_delay.is_zero() && delay > policy.max_delay {
        delay = policy.max_delay;
    }

    delay
}

/// Add symmetric jitter of at most `jitter` (clamped to `delay`) to `delay`
///
/// The signed offset is `min(jitter, delay) * (2 * random - 1)`, truncated
/// toward zero to whole nanoseconds.
pub fn apply_jitter(delay: Duration, jitter: Duration, random: f64) -> Duration {
    let jitter = jitter.min(delay);
    if jitter.is_zero() {
        return delay;
    }

    let offset = (jitter.as_nanos() as f64 * (2.0 * random - 1.0)) as i128;
    let nanos = (delay.as_nanos() as i128 + offset).max(0);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Saturating float-nanoseconds to `Duration` conversion
fn nanos_to_duration(nanos: f64) -> Duration {
    // `as` saturates and maps NaN to zero
    Duration::from_nanos(nanos as u64)
}

/// A predicate that determines whether an error should be retried
///
/// Implement this trait to customize which errors are retryable. By default,
/// all errors are considered retryable. Use this to short-circuit retries
/// for known non-recoverable errors.
///
/// # Example
///
/// ```rust
/// use boundretry::retry::RetryPredicate;
/// use std::io::{Error, ErrorKind};
///
/// struct IoRetryPredicate;
///
/// impl RetryPredicate<Error> for IoRetryPredicate {
///     fn should_retry(&self, error: &Error) -> bool {
///         // Don't retry permanent errors
///         !matches!(
///             error.kind(),
///             ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::InvalidInput
///         )
///     }
/// }
/// ```
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    /// Determine whether the given error should be retried
    fn should_retry(&self, error: &E) -> bool;
}

/// A predicate that always returns true (all errors are retryable)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// A predicate that never retries (no errors are retryable)
#[derive(Debug, Clone, Copy)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn should_retry(&self, _error: &E) -> bool {
        false
    }
}

/// A predicate that uses a closure to determine retryability
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    /// Create a new closure-based predicate
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E, F> RetryPredicate<E> for ClosurePredicate<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

/// A predicate that retries only on specific error messages
#[derive(Debug, Clone)]
pub struct MessagePredicate {
    /// Lowercased patterns that indicate retryable errors
    retryable_patterns: Vec<String>,
}

impl MessagePredicate {
    /// Create a new message predicate with the given patterns
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            retryable_patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Create a predicate for common network errors
    pub fn network_errors() -> Self {
        Self::new([
            "timeout",
            "timed out",
            "connection reset",
            "connection refused",
            "network unreachable",
            "temporary failure",
        ])
    }
}

impl<E: Error> RetryPredicate<E> for MessagePredicate {
    fn should_retry(&self, error: &E) -> bool {
        let error_msg = error.to_string().to_lowercase();
        self.retryable_patterns
            .iter()
            .any(|pattern| error_msg.contains(pattern))
    }
}
