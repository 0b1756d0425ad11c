//! Failure outcomes of the retry executor
//!
//! Every terminal failure wraps the error that triggered it. Callers can branch
//! on the category with [`RetryError::kind`] and still reach the original
//! domain error through [`RetryError::source_ref`] or by walking the
//! [`std::error::Error::source`] chain with [`RetryError::find_cause`].

use std::error::Error;
use std::fmt;

use super::cancel::CancelCause;

/// Category of a retry failure, for coarse matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryErrorKind {
    Unretryable,
    MaxTriesExceeded,
    Cancelled,
}

impl fmt::Display for RetryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetryErrorKind::Unretryable => "unretryable",
            RetryErrorKind::MaxTriesExceeded => "max-tries-exceeded",
            RetryErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Errors returned by the retry executor
///
/// The error type is generic over `E`, the error type of the operation being
/// retried. The three variants are mutually exclusive outcomes of one run.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The retryability predicate rejected the error
    ///
    /// No further attempt was made and no delay was waited.
    Unretryable {
        /// Number of attempts made, including the rejected one
        attempts: u32,
        /// The rejected error
        source: E,
    },

    /// The attempt budget was exhausted
    MaxTriesExceeded {
        /// Number of attempts made
        attempts: u32,
        /// The error from the final attempt
        source: E,
    },

    /// The cancellation signal fired while waiting between attempts
    ///
    /// `Error::source` reports the cancellation cause. The operation's last
    /// error is kept in `last_error`.
    Cancelled {
        /// Number of attempts completed before cancellation
        attempts: u32,
        /// Why the signal fired
        cause: CancelCause,
        /// The error from the last completed attempt
        last_error: E,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Unretryable { source, .. } => {
                write!(f, "unretryable error: {}", source)
            }
            RetryError::MaxTriesExceeded { attempts, source } => {
                write!(
                    f,
                    "reached maximum retries after {} attempts: {}",
                    attempts, source
                )
            }
            RetryError::Cancelled {
                attempts,
                cause,
                last_error,
            } => {
                write!(
                    f,
                    "retry cancelled after {} attempts ({}); last error: {}",
                    attempts, cause, last_error
                )
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Unretryable { source, .. } => Some(source),
            RetryError::MaxTriesExceeded { source, .. } => Some(source),
            RetryError::Cancelled { cause, .. } => Some(cause),
        }
    }
}

impl<E> RetryError<E> {
    /// Create a new unretryable error
    pub fn unretryable(attempts: u32, source: E) -> Self {
        RetryError::Unretryable { attempts, source }
    }

    /// Create a new max-tries error
    pub fn max_tries_exceeded(attempts: u32, source: E) -> Self {
        RetryError::MaxTriesExceeded { attempts, source }
    }

    /// Create a new cancelled error
    pub fn cancelled(attempts: u32, cause: CancelCause, last_error: E) -> Self {
        RetryError::Cancelled {
            attempts,
            cause,
            last_error,
        }
    }

    pub fn kind(&self) -> RetryErrorKind {
        match self {
            RetryError::Unretryable { .. } => RetryErrorKind::Unretryable,
            RetryError::MaxTriesExceeded { .. } => RetryErrorKind::MaxTriesExceeded,
            RetryError::Cancelled { .. } => RetryErrorKind::Cancelled,
        }
    }

    /// Get the number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Unretryable { attempts, .. }
            | RetryError::MaxTriesExceeded { attempts, .. }
            | RetryError::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn is_unretryable(&self) -> bool {
        matches!(self, RetryError::Unretryable { .. })
    }

    pub fn is_max_tries_exceeded(&self) -> bool {
        matches!(self, RetryError::MaxTriesExceeded { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// The cancellation cause, if this run was cancelled
    pub fn cancel_cause(&self) -> Option<CancelCause> {
        match self {
            RetryError::Cancelled { cause, .. } => Some(*cause),
            _ => None,
        }
    }

    /// Get a reference to the operation's error
    pub fn source_ref(&self) -> &E {
        match self {
            RetryError::Unretryable { source, .. } => source,
            RetryError::MaxTriesExceeded { source, .. } => source,
            RetryError::Cancelled { last_error, .. } => last_error,
        }
    }

    /// Get the operation's error, consuming this error
    pub fn into_source(self) -> E {
        match self {
            RetryError::Unretryable { source, .. } => source,
            RetryError::MaxTriesExceeded { source, .. } => source,
            RetryError::Cancelled { last_error, .. } => last_error,
        }
    }

    /// Map the error type using a closure
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::Unretryable { attempts, source } => RetryError::Unretryable {
                attempts,
                source: f(source),
            },
            RetryError::MaxTriesExceeded { attempts, source } => RetryError::MaxTriesExceeded {
                attempts,
                source: f(source),
            },
            RetryError::Cancelled {
                attempts,
                cause,
                last_error,
            } => RetryError::Cancelled {
                attempts,
                cause,
                last_error: f(last_error),
            },
        }
    }
}

impl<E: Error + 'static> RetryError<E> {
    /// Find the first error of type `C` in the cause chain
    ///
    /// Starts at this error itself, then follows `Error::source`. For
    /// `Cancelled` the chain leads to the [`CancelCause`]; the operation's
    /// last error is searched after it.
    pub fn find_cause<C: Error + 'static>(&self) -> Option<&C> {
        search_chain(self).or_else(|| match self {
            RetryError::Cancelled { last_error, .. } => search_chain(last_error),
            _ => None,
        })
    }

    /// Whether the cause chain contains an error of type `C` equal to `target`
    pub fn chain_contains<C>(&self, target: &C) -> bool
    where
        C: Error + PartialEq + 'static,
    {
        self.find_cause::<C>().is_some_and(|found| found == target)
    }
}

fn search_chain<'a, C: Error + 'static>(start: &'a (dyn Error + 'static)) -> Option<&'a C> {
    let mut current = Some(start);
    while let Some(err) = current {
        if let Some(found) = err.downcast_ref::<C>() {
            return Some(found);
        }
        current = err.source();
    }
    None
}
