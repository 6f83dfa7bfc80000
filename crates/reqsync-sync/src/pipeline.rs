//! Approval-gated synchronization
//!
//! Validation errors block; warnings ride along in the outcome so the
//! caller can show them.

use crate::error::SyncError;
use crate::story::plan_user_stories;
use crate::synchronizer::{BatchOptions, BatchOutcome, BatchSynchronizer};
use crate::task::TaskDraft;
use reqsync_document::{RequirementsRecord, RequirementsValidator, ValidationWarning};
use serde::Serialize;

/// Result of a gated run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    /// Advisory warnings from validation
    pub warnings: Vec<ValidationWarning>,
    /// Batch result
    pub batch: BatchOutcome,
}

/// Validate, plan, synchronize
#[derive(Debug)]
pub struct SyncPipeline {
    validator: RequirementsValidator,
    synchronizer: BatchSynchronizer,
}

impl SyncPipeline {
    /// Create pipeline
    #[must_use]
    pub fn new(synchronizer: BatchSynchronizer) -> Self {
        Self {
            validator: RequirementsValidator::new(),
            synchronizer,
        }
    }

    /// Task drafts that a run would create
    ///
    /// # Errors
    ///
    /// [`SyncError::ValidationFailed`] when the record has blocking errors.
    pub fn plan(&self, record: &RequirementsRecord) -> Result<Vec<TaskDraft>, SyncError> {
        let validation = self.validator.validate(record);
        if !validation.is_valid {
            return Err(SyncError::ValidationFailed(validation));
        }
        Ok(plan_user_stories(record)
            .iter()
            .map(TaskDraft::from_story)
            .collect())
    }

    /// Synchronize a validated record
    ///
    /// # Errors
    ///
    /// [`SyncError::ValidationFailed`] before any remote call when the
    /// record has blocking errors, or [`SyncError::InvalidOptions`].
    pub async fn synchronize(
        &self,
        record: &RequirementsRecord,
        options: &BatchOptions,
    ) -> Result<PipelineOutcome, SyncError> {
        let validation = self.validator.validate(record);
        if !validation.is_valid {
            tracing::warn!(
                source = %record.source,
                errors = validation.errors.len(),
                "synchronization refused: record is invalid"
            );
            return Err(SyncError::ValidationFailed(validation));
        }

        let stories = plan_user_stories(record);
        tracing::info!(source = %record.source, stories = stories.len(), "synchronizing requirements");
        let batch = self.synchronizer.create_tasks_batch(&stories, options).await?;
        Ok(PipelineOutcome {
            warnings: validation.warnings,
            batch,
        })
    }
}
