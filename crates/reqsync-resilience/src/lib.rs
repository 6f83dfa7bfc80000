//! Resilience primitives for calls to the remote task service
//!
//! - [`retry`]: exponential backoff over retryable failures
//! - [`token_cache`]: access tokens with expiry and single-flight refresh
//! - [`auth`]: token provider plus one-shot reauthentication
//! - [`rate_limiter`]: token bucket, waits and never rejects
//! - [`circuit_breaker`]: per-operation short-circuiting
//!
//! All timing goes through `tokio::time`, so tests can run on paused time.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod auth;
pub mod circuit_breaker;
pub mod error;
pub mod rate_limiter;
pub mod retry;
pub mod token_cache;

pub use auth::{AuthProvider, Authenticator, Credentials, DEFAULT_REFRESH_THRESHOLD};
pub use circuit_breaker::{BreakerConfig, BreakerRegistry, CircuitBreaker, CircuitState};
pub use error::{
    is_retryable_error, is_retryable_status, CircuitError, RemoteError, RetryError, Retryable,
};
pub use rate_limiter::RateLimiter;
pub use retry::{retry_with_backoff, retry_with_observer, RetryAttempt, RetryPolicy};
pub use token_cache::{CachedToken, IssuedToken, TokenCache};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::auth::{AuthProvider, Authenticator, Credentials};
    pub use crate::circuit_breaker::{BreakerConfig, BreakerRegistry, CircuitBreaker, CircuitState};
    pub use crate::error::{CircuitError, RemoteError, RetryError};
    pub use crate::rate_limiter::RateLimiter;
    pub use crate::retry::{retry_with_backoff, RetryPolicy};
    pub use crate::token_cache::{IssuedToken, TokenCache};
}
