//! Bounded retry execution engine
//!
//! Runs a fallible async operation until it succeeds, the attempt budget is
//! spent, a predicate classifies the error as non-retryable, or a
//! cancellation signal fires between attempts.
//!
//! # Features
//!
//! - Attempt budget where `0` means one attempt and negative means unlimited
//! - Backoff by a constant scale factor, capped by a ceiling before jitter
//! - Symmetric jitter clamped to the delay itself
//! - Injectable timer and random source for deterministic tests
//! - Observable retry events via the `RetryObserver` trait
//! - Built-in `TracingObserver` for logging
//!
//! # Example
//!
//! ```rust,no_run
//! use boundretry::retry::{CancelContext, RetryError, RetryExecutorBuilder};
//! use std::time::Duration;
//!
//! async fn example() -> Result<String, RetryError<std::io::Error>> {
//!     let executor = RetryExecutorBuilder::new()
//!         .with_max_attempts(5)
//!         .with_base_delay(Duration::from_millis(100))
//!         .with_jitter(Duration::from_millis(50))
//!         .with_scale_factor(0.5)
//!         .build();
//!
//!     // Spend no more than about a second retrying
//!     let ctx = CancelContext::new().with_timeout(Duration::from_secs(1));
//!
//!     executor
//!         .try_run(&ctx, |attempt| async move {
//!             // Your fallible operation here
//!             Ok(format!("succeeded on attempt {}", attempt))
//!         })
//!         .await
//! }
//! ```

mod cancel;
mod error;
mod executor;
mod observer;
mod policy;
mod sources;
mod strategies;

pub use cancel::{CancelCause, CancelContext, CancelSignal, NeverCancel};
pub use error::{RetryError, RetryErrorKind};
pub use executor::{retry_with_policy, RetryExecutor, RetryExecutorBuilder};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use policy::RetryPolicy;
pub use sources::{RandomSource, ThreadRandom, Timer, TokioTimer};
pub use strategies::{
    apply_jitter, calculate_delay, scaled_delay, AlwaysRetry, ClosurePredicate,
    MessagePredicate, NeverRetry, RetryPredicate,
};
