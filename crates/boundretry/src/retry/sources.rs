//! Injectable timer and random sources
//!
//! Both are invoked synchronously from the task driving the retry loop and
//! must be safe to call repeatedly. Closures implement the traits directly,
//! which keeps deterministic tests short:
//!
//! ```rust
//! use boundretry::retry::{RandomSource, Timer};
//! use std::time::Duration;
//!
//! let midpoint = || 0.5;
//! assert_eq!(midpoint.next_f64(), 0.5);
//!
//! let instant = |_delay: Duration| std::future::ready(());
//! let _wait = instant.after(Duration::from_secs(60));
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Produces a wait signal that completes after a duration
pub trait Timer: Send + Sync {
    /// Future that resolves once the delay has elapsed
    type Wait: Future<Output = ()> + Send;

    /// Start waiting for `delay`
    fn after(&self, delay: Duration) -> Self::Wait;
}

/// Wall-clock timer backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    type Wait = tokio::time::Sleep;

    fn after(&self, delay: Duration) -> Self::Wait {
        tokio::time::sleep(delay)
    }
}

impl<F, Fut> Timer for F
where
    F: Fn(Duration) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    type Wait = Fut;

    fn after(&self, delay: Duration) -> Self::Wait {
        self(delay)
    }
}

/// Uniform random source in `[0, 1)`
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// Thread-local random source from `rand`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

impl<F> RandomSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn next_f64(&self) -> f64 {
        self()
    }
}
