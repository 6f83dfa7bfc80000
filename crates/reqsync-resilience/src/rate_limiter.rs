//! Token-bucket rate limiter
//!
//! The bucket holds up to `burst_size` tokens and refills continuously at
//! `requests_per_second`. [`RateLimiter::acquire`] waits for a token and
//! never rejects. Waiters are served in arrival order: the bucket lock is
//! a fair `tokio::sync::Mutex` held while the current waiter sleeps.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

const EPSILON: f64 = 1e-6;
const MIN_WAIT: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant, rate: f64, capacity: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }
}

/// Async token-bucket limiter
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_second: f64,
    burst_size: u32,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create limiter with a full bucket
    ///
    /// Non-positive rates are raised to one request per hour and a zero
    /// burst to one; configuration validation rejects both earlier.
    #[must_use]
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        let requests_per_second = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            requests_per_second
        } else {
            1.0 / 3600.0
        };
        let burst_size = burst_size.max(1);
        Self {
            requests_per_second,
            burst_size,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst_size),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Sustained rate
    #[inline]
    #[must_use]
    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    /// Bucket capacity
    #[inline]
    #[must_use]
    pub fn burst_size(&self) -> u32 {
        self.burst_size
    }

    /// Wait for and consume one token
    pub async fn acquire(&self) {
        let capacity = f64::from(self.burst_size);
        let mut bucket = self.bucket.lock().await;
        loop {
            bucket.refill(Instant::now(), self.requests_per_second, capacity);
            if bucket.tokens + EPSILON >= 1.0 {
                bucket.tokens = (bucket.tokens - 1.0).max(0.0);
                return;
            }
            let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / self.requests_per_second)
                .max(MIN_WAIT);
            trace!(wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX), "rate limited");
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(
            Instant::now(),
            self.requests_per_second,
            f64::from(self.burst_size),
        );
        bucket.tokens
    }
}
