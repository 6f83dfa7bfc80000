//! Synchronization configuration
//!
//! Loaded from TOML; every key is optional and falls back to its default.
//!
//! ```toml
//! [retry]
//! max_retries = 3
//! base_delay_ms = 1000
//! max_delay_ms = 10000
//!
//! [rate_limit]
//! requests_per_second = 10.0
//! burst_size = 10
//!
//! [breaker]
//! failure_threshold = 5
//! recovery_timeout_secs = 30
//!
//! [batch]
//! size = 10
//! delay_ms = 1000
//!
//! [auth]
//! refresh_threshold_secs = 300
//! client_id = "reqsync"
//! ```

use crate::error::ConfigError;
use reqsync_resilience::{BreakerConfig, Credentials, RateLimiter, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Retry/backoff settings
    pub retry: RetrySettings,
    /// Outbound rate limit
    pub rate_limit: RateLimitSettings,
    /// Circuit breaker thresholds
    pub breaker: BreakerSettings,
    /// Batch pacing
    pub batch: BatchSettings,
    /// Token handling
    pub auth: AuthSettings,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`]
    /// for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] when the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded sync configuration");
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.size == 0 {
            return Err(ConfigError::invalid("batch.size", "must be at least 1"));
        }
        if !(self.rate_limit.requests_per_second.is_finite()
            && self.rate_limit.requests_per_second > 0.0)
        {
            return Err(ConfigError::invalid(
                "rate_limit.requests_per_second",
                format!("must be positive, got {}", self.rate_limit.requests_per_second),
            ));
        }
        if self.rate_limit.burst_size == 0 {
            return Err(ConfigError::invalid("rate_limit.burst_size", "must be at least 1"));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::invalid("breaker.failure_threshold", "must be at least 1"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::invalid(
                "retry.base_delay_ms",
                "must not exceed retry.max_delay_ms",
            ));
        }
        Ok(())
    }

    /// With retry settings
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// With rate limit settings
    #[inline]
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitSettings) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// With breaker settings
    #[inline]
    #[must_use]
    pub fn with_breaker(mut self, breaker: BreakerSettings) -> Self {
        self.breaker = breaker;
        self
    }

    /// With batch settings
    #[inline]
    #[must_use]
    pub fn with_batch(mut self, batch: BatchSettings) -> Self {
        self.batch = batch;
        self
    }

    /// With auth settings
    #[inline]
    #[must_use]
    pub fn with_auth(mut self, auth: AuthSettings) -> Self {
        self.auth = auth;
        self
    }
}

/// Retry/backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the original attempt
    pub max_retries: u32,
    /// First backoff delay
    pub base_delay_ms: u64,
    /// Backoff ceiling
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

impl RetrySettings {
    /// Executor policy
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// Outbound rate limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Sustained rate
    pub requests_per_second: f64,
    /// Bucket capacity
    pub burst_size: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst_size: 10,
        }
    }
}

impl RateLimitSettings {
    /// Build a limiter with a full bucket
    #[must_use]
    pub fn limiter(&self) -> RateLimiter {
        RateLimiter::new(self.requests_per_second, self.burst_size)
    }
}

/// Circuit breaker thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Open duration before a probe
    pub recovery_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 30,
        }
    }
}

impl BreakerSettings {
    /// Breaker config
    #[must_use]
    pub fn config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
        }
    }
}

/// Batch pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Items per batch
    pub size: usize,
    /// Pause between batches
    pub delay_ms: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            size: 10,
            delay_ms: 1000,
        }
    }
}

/// Token handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Refresh tokens this close to expiry
    pub refresh_threshold_secs: u64,
    /// Client identifier
    pub client_id: String,
    /// Client secret; never written back out
    #[serde(skip_serializing)]
    pub client_secret: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_threshold_secs: 300,
            client_id: "reqsync".to_string(),
            client_secret: String::new(),
        }
    }
}

impl AuthSettings {
    /// Refresh threshold
    #[inline]
    #[must_use]
    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }

    /// Client credentials
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.client_id.clone(), self.client_secret.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.policy().backoff_delay(1), Duration::from_secs(1));
        assert_eq!(config.rate_limit.burst_size, 10);
        assert_eq!(config.breaker.config().recovery_timeout, Duration::from_secs(30));
        assert_eq!(config.batch, BatchSettings { size: 10, delay_ms: 1000 });
        assert_eq!(config.auth.refresh_threshold(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str("[batch]\nsize = 2\n\n[retry]\nmax_retries = 5\n")
            .unwrap();
        assert_eq!(config.batch.size, 2);
        assert_eq!(config.batch.delay_ms, 1000);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.rate_limit, RateLimitSettings::default());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let err = SyncConfig::from_toml_str("[batch]\nsize = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "batch.size", .. }));
    }

    #[test]
    fn rejects_non_positive_rate() {
        let config = SyncConfig::new().with_rate_limit(RateLimitSettings {
            requests_per_second: 0.0,
            burst_size: 1,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "rate_limit.requests_per_second", .. })
        ));
    }

    #[test]
    fn rejects_zero_threshold_and_burst() {
        let zero_threshold = SyncConfig::new().with_breaker(BreakerSettings {
            failure_threshold: 0,
            recovery_timeout_secs: 1,
        });
        assert!(zero_threshold.validate().is_err());

        let zero_burst = SyncConfig::new().with_rate_limit(RateLimitSettings {
            requests_per_second: 1.0,
            burst_size: 0,
        });
        assert!(zero_burst.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = SyncConfig::from_toml_str("[batch\nsize = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auth]\nclient_id = \"ci\"\nclient_secret = \"s3cret\"").unwrap();
        let config = SyncConfig::load(file.path()).unwrap();
        assert_eq!(config.auth.credentials(), Credentials::new("ci", "s3cret"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn secret_is_not_serialized() {
        let config = SyncConfig::new().with_auth(AuthSettings {
            client_secret: "hunter2".into(),
            ..AuthSettings::default()
        });
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("hunter2"));
    }
}
