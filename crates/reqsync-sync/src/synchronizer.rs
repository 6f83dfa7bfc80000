//! Batch task synchronizer
//!
//! Chunks are processed one after another, items within a chunk one after
//! another, so progress callbacks fire in input order. Per item:
//!
//! ```text
//! breaker("tasks.create")
//!   └─ retry with backoff
//!        └─ rate limiter (every attempt)
//!             └─ authenticate_with_retry
//!                  └─ TaskApi::create_task
//! ```
//!
//! A failed item is recorded and the batch continues.

use crate::api::{RemoteTaskId, TaskApi};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::report::FailureReport;
use crate::story::UserStory;
use crate::task::TaskDraft;
use reqsync_resilience::{
    retry_with_backoff, Authenticator, AuthProvider, BreakerRegistry, CircuitError, Credentials,
    RateLimiter, RemoteError, RetryError, RetryPolicy, TokenCache,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Breaker key for task creation
pub const CREATE_TASK_OPERATION: &str = "tasks.create";

/// Progress callback
pub type ProgressCallback = Arc<dyn Fn(SyncProgress) + Send + Sync>;

/// Progress after one item
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SyncProgress {
    /// Items finished, succeeded or failed
    pub completed: usize,
    /// Items in the run
    pub total: usize,
    /// `completed / total` in percent, within 0..=100
    pub percentage: f64,
}

impl SyncProgress {
    fn new(completed: usize, total: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let percentage = if total == 0 {
            100.0
        } else {
            (completed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        };
        Self {
            completed,
            total,
            percentage,
        }
    }
}

/// Batch pacing and observation
#[derive(Clone)]
pub struct BatchOptions {
    /// Items per batch
    pub batch_size: usize,
    /// Pause between batches
    pub batch_delay: Duration,
    /// Called after every item
    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("batch_size", &self.batch_size)
            .field("batch_delay", &self.batch_delay)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl BatchOptions {
    /// Create options
    #[must_use]
    pub fn new(batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            batch_size,
            batch_delay,
            on_progress: None,
        }
    }

    /// Options from the `[batch]` section
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.batch.size, Duration::from_millis(config.batch.delay_ms))
    }

    /// With progress callback
    #[must_use]
    pub fn with_progress(mut self, callback: impl Fn(SyncProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

/// Task created for one story
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedTask {
    /// Position in the input
    pub index: usize,
    /// Story title
    pub title: String,
    /// Remote identifier
    pub task_id: RemoteTaskId,
}

/// Story that could not be turned into a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Position in the input
    pub index: usize,
    /// Story title
    pub title: String,
    /// What happened and what to do
    pub report: FailureReport,
}

/// Result of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Tasks created
    pub tasks_created: usize,
    /// Chunks processed
    pub batches: usize,
    /// Wall time, delays included
    pub total_time: Duration,
    /// Successes, in input order
    pub created: Vec<CreatedTask>,
    /// Failures, in input order
    pub failures: Vec<ItemFailure>,
}

impl BatchOutcome {
    /// Every item succeeded
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Process-wide resilience state
///
/// Clone and hand the same value to every synchronizer so they observe one
/// breaker per operation, one token per credential and one rate budget.
#[derive(Debug, Clone)]
pub struct SharedResilience {
    /// Breakers keyed by operation
    pub breakers: Arc<BreakerRegistry>,
    /// Token cache
    pub tokens: TokenCache,
    /// Outbound rate limiter
    pub limiter: Arc<RateLimiter>,
}

impl SharedResilience {
    /// Build from configuration
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            breakers: Arc::new(BreakerRegistry::new(config.breaker.config())),
            tokens: TokenCache::new(),
            limiter: Arc::new(config.rate_limit.limiter()),
        }
    }
}

impl Default for SharedResilience {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Creates remote tasks in paced batches
pub struct BatchSynchronizer {
    api: Arc<dyn TaskApi>,
    authenticator: Authenticator,
    credentials: Credentials,
    limiter: Arc<RateLimiter>,
    breakers: Arc<BreakerRegistry>,
    retry: RetryPolicy,
}

impl fmt::Debug for BatchSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchSynchronizer")
            .field("credentials", &self.credentials)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl BatchSynchronizer {
    /// Create synchronizer from configuration and shared state
    #[must_use]
    pub fn new(
        config: &SyncConfig,
        api: Arc<dyn TaskApi>,
        provider: Arc<dyn AuthProvider>,
        shared: &SharedResilience,
    ) -> Self {
        let authenticator = Authenticator::with_cache(provider, shared.tokens.clone())
            .with_refresh_threshold(config.auth.refresh_threshold());
        Self {
            api,
            authenticator,
            credentials: config.auth.credentials(),
            limiter: Arc::clone(&shared.limiter),
            breakers: Arc::clone(&shared.breakers),
            retry: config.retry.policy(),
        }
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With credentials
    #[inline]
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Create one task per story
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidOptions`] for a zero batch size. Item failures are
    /// reported in the outcome instead.
    pub async fn create_tasks_batch(
        &self,
        stories: &[UserStory],
        options: &BatchOptions,
    ) -> Result<BatchOutcome, SyncError> {
        if options.batch_size == 0 {
            return Err(SyncError::InvalidOptions("batch size must be at least 1".into()));
        }

        let started = Instant::now();
        let total = stories.len();
        let batches = total.div_ceil(options.batch_size);
        let mut created = Vec::new();
        let mut failures = Vec::new();
        let mut completed = 0;

        for (batch_index, chunk) in stories.chunks(options.batch_size).enumerate() {
            info!(batch = batch_index + 1, batches, items = chunk.len(), "processing batch");

            for story in chunk {
                let index = completed;
                let draft = TaskDraft::from_story(story);
                match self.create_one(&draft).await {
                    Ok(task_id) => {
                        tracing::debug!(index, task_id = %task_id, "task created");
                        created.push(CreatedTask {
                            index,
                            title: story.title.clone(),
                            task_id,
                        });
                    }
                    Err(err) => {
                        let report = FailureReport::from_remote_call(&err)
                            .with_operation("create task")
                            .with_item(format!("#{} {}", index + 1, story.title));
                        warn!(index, category = %report.category, error = %err, "task creation failed");
                        failures.push(ItemFailure {
                            index,
                            title: story.title.clone(),
                            report,
                        });
                    }
                }

                completed += 1;
                if let Some(on_progress) = &options.on_progress {
                    on_progress(SyncProgress::new(completed, total));
                }
            }

            if batch_index + 1 < batches && !options.batch_delay.is_zero() {
                tokio::time::sleep(options.batch_delay).await;
            }
        }

        let outcome = BatchOutcome {
            tasks_created: created.len(),
            batches,
            total_time: started.elapsed(),
            created,
            failures,
        };
        info!(
            created = outcome.tasks_created,
            failed = outcome.failures.len(),
            batches,
            "synchronization finished"
        );
        Ok(outcome)
    }

    async fn create_one(
        &self,
        draft: &TaskDraft,
    ) -> Result<RemoteTaskId, CircuitError<RetryError<RemoteError>>> {
        let breaker = self.breakers.breaker(CREATE_TASK_OPERATION);
        let this = self;
        breaker
            .execute_classified(
                move || {
                    retry_with_backoff(&this.retry, move || async move {
                        this.limiter.acquire().await;
                        this.authenticator
                            .authenticate_with_retry(&this.credentials, move |token| async move {
                                this.api.create_task(&token, draft).await
                            })
                            .await
                    })
                },
                |err: &RetryError<RemoteError>| err.inner().counts_against_breaker(),
            )
            .await
    }
}
