//! Authentication with cached tokens
//!
//! [`Authenticator`] hands out tokens from a [`TokenCache`], refreshing through
//! an [`AuthProvider`] when needed. When a call is rejected for an expired or
//! revoked token, the token is invalidated and the call retried exactly once.

use crate::error::RemoteError;
use crate::token_cache::{IssuedToken, TokenCache};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default margin before expiry at which a token is refreshed
pub const DEFAULT_REFRESH_THRESHOLD: Duration = Duration::from_secs(300);

/// Client credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Client identifier
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Token cache key for these credentials
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("token:{}", self.client_id)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Issues access tokens
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a token
    async fn issue_token(&self, credentials: &Credentials) -> Result<IssuedToken, RemoteError>;
}

/// Token source with one-shot reauthentication
pub struct Authenticator {
    provider: Arc<dyn AuthProvider>,
    cache: TokenCache,
    refresh_threshold: Duration,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("cache", &self.cache)
            .field("refresh_threshold", &self.refresh_threshold)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create authenticator with a private cache
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self::with_cache(provider, TokenCache::new())
    }

    /// Create authenticator sharing an existing cache
    #[must_use]
    pub fn with_cache(provider: Arc<dyn AuthProvider>, cache: TokenCache) -> Self {
        Self {
            provider,
            cache,
            refresh_threshold: DEFAULT_REFRESH_THRESHOLD,
        }
    }

    /// Set refresh threshold
    #[inline]
    #[must_use]
    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    /// Underlying cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Current token, refreshed if missing or close to expiry
    ///
    /// # Errors
    ///
    /// Provider failure.
    pub async fn token(&self, credentials: &Credentials) -> Result<String, RemoteError> {
        let provider = Arc::clone(&self.provider);
        let owned = credentials.clone();
        self.cache
            .get_or_refresh(
                &credentials.cache_key(),
                move || async move { provider.issue_token(&owned).await },
                self.refresh_threshold,
            )
            .await
    }

    /// Run `auth_fn` with a token, reauthenticating once on rejection
    ///
    /// A second rejection is returned as is.
    ///
    /// # Errors
    ///
    /// Provider failure or the error from `auth_fn`.
    pub async fn authenticate_with_retry<T, F, Fut>(
        &self,
        credentials: &Credentials,
        mut auth_fn: F,
    ) -> Result<T, RemoteError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let token = self.token(credentials).await?;
        match auth_fn(token.clone()).await {
            Err(err) if err.requires_reauthentication() => {
                warn!(client_id = %credentials.client_id, error = %err, "token rejected, reauthenticating");
                self.cache.invalidate_if(&credentials.cache_key(), &token);
                let fresh = self.token(credentials).await?;
                let result = auth_fn(fresh).await;
                if result.is_ok() {
                    debug!(client_id = %credentials.client_id, "call succeeded after reauthentication");
                }
                result
            }
            other => other,
        }
    }
}
