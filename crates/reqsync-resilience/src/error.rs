//! Error types for remote calls
//!
//! Provides:
//! - [`RemoteError`]: what the remote API or transport reported
//! - [`RetryError`]: terminal outcome of the retry executor
//! - [`CircuitError`]: short-circuit versus genuine failure
//!
//! `RemoteError` is `Clone` so one refresh result can be handed to every
//! waiter of a single-flight token refresh.

use std::time::Duration;

/// Failure reported by a remote collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Connection reset, DNS failure, timeout on the wire
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP-style status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code
        status: u16,
        /// Response message
        message: String,
    },

    /// Access token expired or was revoked
    #[error("access token expired: {0}")]
    TokenExpired(String),
}

impl RemoteError {
    /// Create transport error
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create HTTP status error
    #[inline]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Status code, when the remote answered
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transient failure that is safe to reattempt unchanged
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => is_retryable_status(*status),
            Self::TokenExpired(_) => false,
        }
    }

    /// Failure that a fresh credential may fix
    #[inline]
    #[must_use]
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::TokenExpired(_) | Self::Http { status: 401, .. })
    }

    /// Failure that says something about the service's health
    ///
    /// A rejected request (400, 403, 404...) means the service answered.
    #[inline]
    #[must_use]
    pub fn counts_against_breaker(&self) -> bool {
        self.is_retryable()
    }
}

/// Status codes worth retrying: timeouts, throttling and server faults
#[inline]
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// Classifier used by the retry executor
#[inline]
#[must_use]
pub fn is_retryable_error(error: &RemoteError) -> bool {
    error.is_retryable()
}

/// Errors the retry executor knows how to classify
pub trait Retryable {
    /// Transient and safe to reattempt
    fn is_retryable(&self) -> bool;
}

impl Retryable for RemoteError {
    fn is_retryable(&self) -> bool {
        RemoteError::is_retryable(self)
    }
}

/// Terminal outcome of [`crate::retry::retry_with_backoff`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError<E> {
    /// Classified non-retryable; surfaced without spending retry budget
    #[error("{0}")]
    Permanent(E),

    /// Retry budget spent
    #[error("failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Total attempts, original included
        attempts: u32,
        /// Error from the final attempt
        last: E,
    },
}

impl<E> RetryError<E> {
    /// Underlying error
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &E {
        match self {
            Self::Permanent(e) | Self::Exhausted { last: e, .. } => e,
        }
    }

    /// Consume into the underlying error
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> E {
        match self {
            Self::Permanent(e) | Self::Exhausted { last: e, .. } => e,
        }
    }

    /// Attempts made, when the budget was exhausted
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Permanent(_) => None,
            Self::Exhausted { attempts, .. } => Some(*attempts),
        }
    }
}

/// Outcome of a call guarded by [`crate::circuit_breaker::CircuitBreaker`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError<E> {
    /// Short-circuited: the operation was not attempted
    #[error("service unavailable: circuit '{operation}' is open (retry in {retry_after:?})")]
    Open {
        /// Breaker name
        operation: String,
        /// Time until the next probe is allowed
        retry_after: Duration,
    },

    /// The operation ran and failed
    #[error("{0}")]
    Inner(E),
}

impl<E> CircuitError<E> {
    /// Call was short-circuited
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Underlying error, if the operation ran
    #[inline]
    #[must_use]
    pub fn inner(&self) -> Option<&E> {
        match self {
            Self::Open { .. } => None,
            Self::Inner(e) => Some(e),
        }
    }
}
