//! Access token cache
//!
//! Tokens are keyed by credential identity and expire `expires_in` seconds
//! after issue. A non-positive lifetime is expired immediately.
//!
//! [`TokenCache::get_or_refresh`] is single-flight: concurrent callers for a
//! key that needs a refresh share one in-flight request and its result.

use crate::error::RemoteError;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RemoteError>>>;

/// Token as returned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Opaque token value
    pub value: String,
    /// Lifetime in seconds; zero or negative means already expired
    pub expires_in_secs: i64,
}

impl IssuedToken {
    /// Create issued token
    #[inline]
    pub fn new(value: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            value: value.into(),
            expires_in_secs,
        }
    }
}

/// Cached token with its issue time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    /// Opaque token value
    pub value: String,
    /// When the token was stored
    pub issued_at: Instant,
    /// Lifetime in seconds
    pub expires_in_secs: i64,
}

impl CachedToken {
    /// Expiry instant; `None` when the lifetime is not positive
    #[must_use]
    pub fn expires_at(&self) -> Option<Instant> {
        let secs = u64::try_from(self.expires_in_secs).ok().filter(|s| *s > 0)?;
        self.issued_at.checked_add(Duration::from_secs(secs))
    }

    /// Lifetime left at `now`
    #[must_use]
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.expires_at()
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or_default()
    }

    /// Unexpired at `now`
    #[inline]
    #[must_use]
    pub fn is_valid_at(&self, now: Instant) -> bool {
        !self.remaining_at(now).is_zero()
    }
}

/// Concurrent token cache with single-flight refresh
#[derive(Clone, Default)]
pub struct TokenCache {
    entries: Arc<DashMap<String, CachedToken>>,
    in_flight: Arc<Mutex<HashMap<String, RefreshFuture>>>,
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

impl TokenCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token issued now
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, expires_in_secs: i64) {
        let key = key.into();
        trace!(key = %key, expires_in_secs, "caching token");
        self.entries.insert(
            key,
            CachedToken {
                value: value.into(),
                issued_at: Instant::now(),
                expires_in_secs,
            },
        );
    }

    /// Unexpired token for `key`; expired entries are evicted
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .and_then(|entry| entry.is_valid_at(now).then(|| entry.value.clone()));
        if value.is_none() {
            self.entries.remove_if(key, |_, token| !token.is_valid_at(now));
        }
        value
    }

    /// Unexpired token present
    #[inline]
    #[must_use]
    pub fn is_valid(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Drop the token for `key`
    pub fn invalidate(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            debug!(key, "token invalidated");
        }
    }

    /// Drop the token for `key` only while it still holds `value`
    ///
    /// Returns whether an entry was removed. A token refreshed by another
    /// caller in the meantime is kept.
    pub fn invalidate_if(&self, key: &str, value: &str) -> bool {
        let removed = self
            .entries
            .remove_if(key, |_, token| token.value == value)
            .is_some();
        if removed {
            debug!(key, "token invalidated");
        }
        removed
    }

    /// Number of stored entries, expired ones included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Cache is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached token, or a refreshed one when missing or within `refresh_threshold` of expiry
    ///
    /// Concurrent callers for the same key await a single `refresh` call.
    ///
    /// # Errors
    ///
    /// The refresh failure, delivered to every waiter.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        key: &str,
        refresh: F,
        refresh_threshold: Duration,
    ) -> Result<String, RemoteError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedToken, RemoteError>> + Send + 'static,
    {
        if let Some(value) = self.fresh(key, refresh_threshold) {
            return Ok(value);
        }

        let pending = {
            let mut in_flight = self.in_flight.lock();
            if let Some(existing) = in_flight.get(key) {
                debug!(key, "joining in-flight token refresh");
                existing.clone()
            } else if let Some(value) = self.fresh(key, refresh_threshold) {
                return Ok(value);
            } else {
                let pending = self.spawn_refresh(key.to_string(), refresh());
                in_flight.insert(key.to_string(), pending.clone());
                pending
            }
        };
        pending.await
    }

    fn fresh(&self, key: &str, refresh_threshold: Duration) -> Option<String> {
        let now = Instant::now();
        self.entries.get(key).and_then(|entry| {
            (entry.remaining_at(now) > refresh_threshold).then(|| entry.value.clone())
        })
    }

    fn spawn_refresh<Fut>(&self, key: String, refresh: Fut) -> RefreshFuture
    where
        Fut: Future<Output = Result<IssuedToken, RemoteError>> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let in_flight = Arc::clone(&self.in_flight);
        async move {
            debug!(key = %key, "refreshing token");
            let result = refresh.await;
            match &result {
                Ok(issued) => {
                    entries.insert(
                        key.clone(),
                        CachedToken {
                            value: issued.value.clone(),
                            issued_at: Instant::now(),
                            expires_in_secs: issued.expires_in_secs,
                        },
                    );
                }
                Err(err) => debug!(key = %key, error = %err, "token refresh failed"),
            }
            in_flight.lock().remove(&key);
            result.map(|issued| issued.value)
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn token_expires_after_lifetime() {
        let cache = TokenCache::new();
        cache.set("svc", "abc", 60);
        assert_eq!(cache.get("svc").as_deref(), Some("abc"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.is_valid("svc"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!cache.is_valid("svc"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn non_positive_lifetime_is_expired() {
        let cache = TokenCache::new();
        cache.set("zero", "a", 0);
        cache.set("negative", "b", -5);
        assert_eq!(cache.get("zero"), None);
        assert_eq!(cache.get("negative"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_removes_token() {
        let cache = TokenCache::new();
        cache.set("svc", "abc", 3600);
        cache.invalidate("svc");
        assert_eq!(cache.get("svc"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_if_keeps_newer_token() {
        let cache = TokenCache::new();
        cache.set("svc", "new", 3600);
        assert!(!cache.invalidate_if("svc", "old"));
        assert_eq!(cache.get("svc").as_deref(), Some("new"));
        assert!(cache.invalidate_if("svc", "new"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_inside_threshold() {
        let cache = TokenCache::new();
        cache.set("svc", "old", 400);
        let threshold = Duration::from_secs(300);

        let token = cache
            .get_or_refresh("svc", || async { Ok(IssuedToken::new("new", 3600)) }, threshold)
            .await;
        assert_eq!(token.as_deref(), Ok("old"));

        tokio::time::advance(Duration::from_secs(101)).await;
        let token = cache
            .get_or_refresh("svc", || async { Ok(IssuedToken::new("new", 3600)) }, threshold)
            .await;
        assert_eq!(token.as_deref(), Ok("new"));
        assert_eq!(cache.get("svc").as_deref(), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_refresh() {
        let cache = TokenCache::new();
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_refresh(
                        "svc",
                        move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(IssuedToken::new("shared", 3600))
                        },
                        Duration::from_secs(300),
                    )
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_deref(), Ok("shared"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_failure_reaches_every_waiter_and_is_not_cached() {
        let cache = TokenCache::new();
        let first = cache.get_or_refresh(
            "svc",
            || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(RemoteError::http(503, "idp down"))
            },
            Duration::ZERO,
        );
        let second = cache.get_or_refresh(
            "svc",
            || async { Ok(IssuedToken::new("unused", 60)) },
            Duration::ZERO,
        );
        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, Err(RemoteError::http(503, "idp down")));
        assert_eq!(b, Err(RemoteError::http(503, "idp down")));
        assert!(cache.is_empty());

        let retried = cache
            .get_or_refresh("svc", || async { Ok(IssuedToken::new("ok", 60)) }, Duration::ZERO)
            .await;
        assert_eq!(retried.as_deref(), Ok("ok"));
    }
}
