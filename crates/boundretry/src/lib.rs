//! # boundretry
//!
//! Bounded retry executor providing:
//! - An attempt loop that stops on success, an exhausted attempt budget,
//!   a non-retryable error, or an external cancellation signal
//! - Backoff with a delay ceiling and symmetric random jitter
//! - Typed failure outcomes that keep the original error reachable
//! - Serde-backed retry configuration with environment overrides

pub mod config;
pub mod error;
pub mod retry;

pub use config::{RetryConfig, RetryPoliciesConfig};
pub use error::{Error, Result};
pub use retry::{
    calculate_delay, retry_with_policy, CancelCause, CancelContext, CancelSignal, NeverCancel,
    RetryError, RetryErrorKind, RetryExecutor, RetryExecutorBuilder, RetryPolicy,
};
