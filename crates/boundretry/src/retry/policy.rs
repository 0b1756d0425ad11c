//! Retry policy values
//!
//! A [`RetryPolicy`] holds the numeric half of a retry configuration: the
//! attempt budget and the parameters of the delay calculation. The injected
//! collaborators (predicate, timer, random source, observer) live on the
//! executor so that a policy stays plain data.

use std::time::Duration;

/// Attempt budget and backoff parameters for a retry executor
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts to make
    ///
    /// The operation always runs at least once, so `0` behaves like `1`.
    /// A negative value means there is no limit on the number of attempts.
    pub max_attempts: i32,

    /// Delay before the second attempt, before scaling and jitter
    pub base_delay: Duration,

    /// Maximum random adjustment added to or subtracted from each delay
    ///
    /// Silently limited to each iteration's pre-jitter delay.
    pub jitter: Duration,

    /// Growth factor: each delay is the previous one multiplied by `1 + scale_factor`
    ///
    /// `0` disables growth. Negative or non-finite values are treated as `0`.
    pub scale_factor: f64,

    /// Ceiling applied to the scaled delay before jitter; zero means no ceiling
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay: Duration::ZERO,
            jitter: Duration::ZERO,
            scale_factor: 0.0,
            max_delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Create a policy that makes exactly one attempt
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries
    pub fn single_attempt() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// A policy with no attempt limit
    ///
    /// Retrying only stops on success, a non-retryable error, or cancellation,
    /// or once `u32::MAX` attempts have been made.
    pub fn unlimited() -> Self {
        Self::default().with_max_attempts(-1)
    }

    /// Constant delay between attempts
    pub fn fixed(max_attempts: i32, delay: Duration) -> Self {
        Self::default()
            .with_max_attempts(max_attempts)
            .with_base_delay(delay)
    }

    /// Exponential backoff: `base_delay * (1 + scale_factor)^(n-1)`
    pub fn exponential(max_attempts: i32, base_delay: Duration, scale_factor: f64) -> Self {
        Self::default()
            .with_max_attempts(max_attempts)
            .with_base_delay(base_delay)
            .with_scale_factor(scale_factor)
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Whether the policy places no limit on the number of attempts
    pub fn is_unlimited(&self) -> bool {
        self.max_attempts < 0
    }

    /// Number of attempts the policy allows, or `None` when unlimited
    pub fn attempt_budget(&self) -> Option<u32> {
        if self.is_unlimited() {
            None
        } else {
            Some(self.max_attempts.max(1) as u32)
        }
    }

    /// Whether another attempt is allowed after `attempts` have been made
    ///
    /// Unlimited policies stop at `u32::MAX` attempts, the last index the
    /// executor can hand out.
    pub(crate) fn allows_another(&self, attempts: u32) -> bool {
        match self.attempt_budget() {
            None => attempts < u32::MAX,
            Some(budget) => attempts < budget,
        }
    }
}
