//! Circuit breaker
//!
//! | state    | on success       | on counted failure                 | on call                          |
//! |----------|------------------|------------------------------------|----------------------------------|
//! | Closed   | reset failures   | open at `failure_threshold`        | run                              |
//! | Open     | n/a              | n/a                                | reject until `recovery_timeout`  |
//! | HalfOpen | close            | reopen                             | one probe, others rejected       |
//!
//! Failures the classifier does not count (a rejected request, say) mean the
//! service answered, so they are treated like success.

use crate::error::CircuitError;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected without being attempted
    Open,
    /// One probe call decides between closing and reopening
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        })
    }
}

/// Breaker thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive counted failures that open the circuit
    pub failure_threshold: u32,
    /// Time the circuit stays open before a probe is allowed
    pub recovery_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Per-operation circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    operation: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create closed breaker
    pub fn new(operation: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            operation: operation.into(),
            config: BreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                ..config
            },
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: 0,
                last_failure: None,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Guarded operation name
    #[inline]
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Current state
    ///
    /// An open circuit whose recovery timeout has elapsed reports `HalfOpen`.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock();
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) if at.elapsed() >= self.config.recovery_timeout => {
                CircuitState::HalfOpen
            }
            (state, _) => state,
        }
    }

    /// Consecutive counted failures
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failures
    }

    /// Time of the most recent counted failure
    #[must_use]
    pub fn last_failure(&self) -> Option<Instant> {
        self.inner.lock().last_failure
    }

    /// Run `operation`, counting every failure
    ///
    /// # Errors
    ///
    /// [`CircuitError::Open`] without running the operation, or the
    /// operation's own error.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_classified(operation, |_| true).await
    }

    /// Run `operation`, counting only failures for which `counts` is true
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute`].
    pub async fn execute_classified<T, E, F, Fut, C>(
        &self,
        operation: F,
        counts: C,
    ) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&E) -> bool,
    {
        let probe = self.admit()?;
        let mut guard = ProbeGuard {
            breaker: self,
            armed: probe,
        };
        let result = operation().await;
        guard.armed = false;
        match &result {
            Err(err) if counts(err) => self.record_failure(),
            _ => self.record_success(),
        }
        result.map_err(CircuitError::Inner)
    }

    /// Admit a call; `true` when it is the half-open probe
    fn admit<E>(&self) -> Result<bool, CircuitError<E>> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(false),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map_or(Duration::MAX, |at| at.elapsed());
                if elapsed >= self.config.recovery_timeout {
                    info!(operation = %self.operation, "circuit half-open, probing");
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    Ok(true)
                } else {
                    Err(self.open_error(self.config.recovery_timeout - elapsed))
                }
            }
            CircuitState::HalfOpen if inner.probe_in_flight => Err(self.open_error(Duration::ZERO)),
            CircuitState::HalfOpen => {
                inner.probe_in_flight = true;
                Ok(true)
            }
        }
    }

    fn open_error<E>(&self, retry_after: Duration) -> CircuitError<E> {
        CircuitError::Open {
            operation: self.operation.clone(),
            retry_after,
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            info!(operation = %self.operation, "circuit closed");
        }
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        inner.failures = inner.failures.saturating_add(1);
        inner.last_failure = Some(now);
        match inner.state {
            CircuitState::HalfOpen => {
                warn!(operation = %self.operation, "probe failed, circuit reopened");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                inner.probe_in_flight = false;
            }
            CircuitState::Closed if inner.failures >= self.config.failure_threshold => {
                warn!(
                    operation = %self.operation,
                    failures = inner.failures,
                    "circuit opened"
                );
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
            }
            _ => {}
        }
    }

    fn abandon_probe(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen && inner.probe_in_flight {
            warn!(operation = %self.operation, "probe abandoned, circuit reopened");
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.probe_in_flight = false;
        }
    }
}

/// Reopens the circuit if a probe is dropped before it completes
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.abandon_probe();
        }
    }
}

/// Breakers keyed by operation name
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    config: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Create registry; new breakers use `config`
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Breaker for `operation`, created on first use
    #[must_use]
    pub fn breaker(&self, operation: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(operation) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.breakers
                .entry(operation.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(operation, self.config)))
                .value(),
        )
    }

    /// Snapshot of every breaker's state, sorted by name
    #[must_use]
    pub fn states(&self) -> Vec<(String, CircuitState)> {
        let mut states: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }
}
