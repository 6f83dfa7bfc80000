//! In-memory task service
//!
//! Stands in for the remote tracker when no real one is configured, and
//! can inject periodic failures to exercise the resilience chain.

use crate::api::{RemoteTaskId, TaskApi};
use crate::task::TaskDraft;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqsync_resilience::{AuthProvider, Credentials, IssuedToken, RemoteError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use ulid::Ulid;

/// Task accepted by [`SimulatedTaskApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
    /// Assigned identifier
    pub id: RemoteTaskId,
    /// Payload as received
    pub draft: TaskDraft,
    /// Acceptance time
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct FailurePlan {
    every: u64,
    status: u16,
}

/// In-memory [`TaskApi`]
#[derive(Debug, Default)]
pub struct SimulatedTaskApi {
    calls: AtomicU64,
    failure: Option<FailurePlan>,
    revoked: Mutex<HashSet<String>>,
    tasks: Mutex<Vec<StoredTask>>,
}

impl SimulatedTaskApi {
    /// Create service that always succeeds
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `every`-th call with `status`; zero disables failures
    #[inline]
    #[must_use]
    pub fn with_failure_every(mut self, every: u64, status: u16) -> Self {
        self.failure = (every > 0).then_some(FailurePlan { every, status });
        self
    }

    /// Reject `token` with 401 from now on
    pub fn revoke_token(&self, token: impl Into<String>) {
        self.revoked.lock().insert(token.into());
    }

    /// Calls received, failed ones included
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Accepted tasks, in creation order
    #[must_use]
    pub fn created(&self) -> Vec<StoredTask> {
        self.tasks.lock().clone()
    }
}

#[async_trait]
impl TaskApi for SimulatedTaskApi {
    async fn create_task(&self, token: &str, draft: &TaskDraft) -> Result<RemoteTaskId, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if token.is_empty() || self.revoked.lock().contains(token) {
            return Err(RemoteError::http(401, "invalid or expired token"));
        }
        if draft.title.trim().is_empty() {
            return Err(RemoteError::http(400, "task title is required"));
        }
        if let Some(plan) = self.failure {
            if call % plan.every == 0 {
                tracing::debug!(call, status = plan.status, "simulated failure");
                return Err(RemoteError::http(plan.status, "simulated failure"));
            }
        }

        let id = RemoteTaskId::new(format!("task_{}", Ulid::new()));
        self.tasks.lock().push(StoredTask {
            id: id.clone(),
            draft: draft.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }
}

/// Identity provider that issues numbered tokens
#[derive(Debug)]
pub struct SimulatedAuthProvider {
    issued: AtomicU64,
    lifetime_secs: i64,
}

impl SimulatedAuthProvider {
    /// Create provider issuing tokens valid for `lifetime_secs`
    #[must_use]
    pub fn new(lifetime_secs: i64) -> Self {
        Self {
            issued: AtomicU64::new(0),
            lifetime_secs,
        }
    }

    /// Tokens issued so far
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedAuthProvider {
    fn default() -> Self {
        Self::new(3600)
    }
}

#[async_trait]
impl AuthProvider for SimulatedAuthProvider {
    async fn issue_token(&self, credentials: &Credentials) -> Result<IssuedToken, RemoteError> {
        if credentials.client_id.is_empty() {
            return Err(RemoteError::http(401, "unknown client"));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IssuedToken::new(
            format!("sim-{}-{n}", credentials.client_id),
            self.lifetime_secs,
        ))
    }
}
