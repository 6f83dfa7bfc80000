//! Remote task service port

use crate::task::TaskDraft;
use async_trait::async_trait;
use reqsync_resilience::RemoteError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the remote tracker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteTaskId(String);

impl RemoteTaskId {
    /// Wrap a remote identifier
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated task creation
///
/// Implementations map every non-success response to a [`RemoteError`]
/// with its status so the caller can classify it.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Create one task
    async fn create_task(&self, token: &str, draft: &TaskDraft) -> Result<RemoteTaskId, RemoteError>;
}
