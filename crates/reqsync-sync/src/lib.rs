//! reqsync Synchronization Layer
//!
//! Converts a validated [`reqsync_document::RequirementsRecord`] into remote
//! tasks through the resilience chain in [`reqsync_resilience`].
//!
//! # Flow
//!
//! ```text
//! RequirementsRecord → validate (gate) → plan_user_stories → TaskDraft::from_story
//!                                                               ↓
//!                          BatchSynchronizer::create_tasks_batch → TaskApi
//! ```
//!
//! # Example
//!
//! ```rust
//! use reqsync_sync::{
//!     BatchOptions, BatchSynchronizer, SharedResilience, SimulatedAuthProvider,
//!     SimulatedTaskApi, SyncConfig, SyncPipeline,
//! };
//! use reqsync_document::RequirementsRecord;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = SyncConfig::default();
//! let shared = SharedResilience::from_config(&config);
//! let synchronizer = BatchSynchronizer::new(
//!     &config,
//!     Arc::new(SimulatedTaskApi::new()),
//!     Arc::new(SimulatedAuthProvider::default()),
//!     &shared,
//! );
//! let pipeline = SyncPipeline::new(synchronizer);
//!
//! let record = RequirementsRecord::default()
//!     .with_title("Portal")
//!     .with_summary("Self-service portal")
//!     .with_objectives(["Fewer calls"])
//!     .with_functional_requirements(["Login"])
//!     .with_acceptance_criteria(["Login under 2s"])
//!     .with_stakeholders(["alice"]);
//!
//! let outcome = pipeline.synchronize(&record, &BatchOptions::default()).await.unwrap();
//! assert_eq!(outcome.batch.tasks_created, 1);
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod simulated;
pub mod story;
pub mod synchronizer;
pub mod task;

// Re-exports for convenience
pub use api::{RemoteTaskId, TaskApi};
pub use config::{
    AuthSettings, BatchSettings, BreakerSettings, RateLimitSettings, RetrySettings, SyncConfig,
};
pub use error::{ConfigError, SyncError};
pub use pipeline::{PipelineOutcome, SyncPipeline};
pub use report::{FailureCategory, FailureReport};
pub use simulated::{SimulatedAuthProvider, SimulatedTaskApi, StoredTask};
pub use story::{estimate_effort, plan_user_stories, truncate_title, UserStory, MAX_TITLE_CHARS};
pub use synchronizer::{
    BatchOptions, BatchOutcome, BatchSynchronizer, CreatedTask, ItemFailure, ProgressCallback,
    SharedResilience, SyncProgress, CREATE_TASK_OPERATION,
};
pub use task::{priority_rank, story_points, ChecklistItem, Complexity, TaskDraft};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for synchronization
    pub use crate::{
        plan_user_stories, BatchOptions, BatchOutcome, BatchSynchronizer, FailureReport,
        SharedResilience, SyncConfig, SyncError, SyncPipeline, TaskApi, TaskDraft, UserStory,
    };
}
