//! Cancellation signals observed between attempts
//!
//! The executor never imposes a time budget of its own. Callers limit total
//! retry time by handing it a [`CancelSignal`]; the signal is raced against the
//! inter-attempt delay and never interrupts a running attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a cancellation signal fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CancelCause {
    /// The signal was cancelled explicitly
    #[error("operation cancelled")]
    Cancelled,

    /// The signal's deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// An external indication that retrying should stop
///
/// `wait` resolves once the signal fires and reports the cause. It may be
/// called many times; every call after the signal fired resolves immediately.
pub trait CancelSignal: Send + Sync {
    /// Wait until the signal fires
    fn wait(&self) -> impl Future<Output = CancelCause> + Send;
}

/// A signal that never fires
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    async fn wait(&self) -> CancelCause {
        std::future::pending().await
    }
}

impl CancelSignal for CancellationToken {
    async fn wait(&self) -> CancelCause {
        self.cancelled().await;
        CancelCause::Cancelled
    }
}

impl<T: CancelSignal> CancelSignal for Arc<T> {
    fn wait(&self) -> impl Future<Output = CancelCause> + Send {
        (**self).wait()
    }
}

/// Cancellation token with an optional deadline
///
/// # Example
///
/// ```rust
/// use boundretry::CancelContext;
/// use std::time::Duration;
///
/// # async fn example() {
/// let ctx = CancelContext::new().with_timeout(Duration::from_secs(1));
/// assert!(!ctx.is_cancelled());
///
/// ctx.cancel();
/// assert!(ctx.is_cancelled());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelContext {
    /// Create a context that only fires when cancelled explicitly
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire with [`CancelCause::DeadlineExceeded`] once `timeout` has elapsed
    ///
    /// Never extends an earlier deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Fire with [`CancelCause::DeadlineExceeded`] at `deadline`
    ///
    /// Never extends an earlier deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// A context that fires when this one does, and can be cancelled on its own
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this context and all of its children
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The cause if the context has already fired
    pub fn cause(&self) -> Option<CancelCause> {
        if self.token.is_cancelled() {
            return Some(CancelCause::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }
}

impl From<CancellationToken> for CancelContext {
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }
}

impl CancelSignal for CancelContext {
    async fn wait(&self) -> CancelCause {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => CancelCause::Cancelled,
                    () = tokio::time::sleep_until(deadline) => CancelCause::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                CancelCause::Cancelled
            }
        }
    }
}
