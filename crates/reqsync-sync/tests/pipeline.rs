//! Approval gate in front of synchronization.

use reqsync_document::{analyze_document, SourceRef};
use reqsync_sync::{
    BatchOptions, BatchSynchronizer, FailureCategory, FailureReport, SharedResilience,
    SimulatedAuthProvider, SimulatedTaskApi, SyncConfig, SyncError, SyncPipeline,
};
use reqsync_test_utils::{complete_record, INVALID_DOCUMENT, SAMPLE_DOCUMENT};
use std::sync::Arc;
use std::time::Duration;

fn pipeline(api: Arc<SimulatedTaskApi>) -> SyncPipeline {
    let config = SyncConfig::default();
    let shared = SharedResilience::from_config(&config);
    SyncPipeline::new(BatchSynchronizer::new(
        &config,
        api,
        Arc::new(SimulatedAuthProvider::default()),
        &shared,
    ))
}

#[tokio::test(start_paused = true)]
async fn invalid_record_is_refused_before_any_call() {
    let api = Arc::new(SimulatedTaskApi::new());
    let analysis = analyze_document(INVALID_DOCUMENT, SourceRef::inline());

    let err = pipeline(api.clone())
        .synchronize(&analysis.record, &BatchOptions::default())
        .await
        .unwrap_err();

    let SyncError::ValidationFailed(result) = &err else {
        panic!("expected validation failure, got {err:?}");
    };
    assert!(!result.errors.is_empty());
    assert_eq!(api.calls(), 0);
    assert_eq!(FailureReport::from_sync_error(&err).category, FailureCategory::Validation);
}

#[tokio::test(start_paused = true)]
async fn sample_document_synchronizes_every_requirement() {
    let api = Arc::new(SimulatedTaskApi::new());
    let analysis = analyze_document(SAMPLE_DOCUMENT, SourceRef::new("portal.md"));
    assert!(analysis.is_submittable(), "{}", analysis.validation);

    let outcome = pipeline(api.clone())
        .synchronize(&analysis.record, &BatchOptions::new(2, Duration::from_millis(100)))
        .await
        .unwrap();

    assert_eq!(outcome.batch.tasks_created, 3);
    assert_eq!(outcome.batch.batches, 2);
    assert!(outcome.warnings.is_empty());

    let created = api.created();
    assert_eq!(created[0].draft.title, "Customers can log in");
    assert_eq!(created[0].draft.priority_rank, 3);
    assert_eq!(created[0].draft.checklist.len(), 2);
    assert!(created[0].draft.labels.contains(&"nfr-linked".to_string()));
}

#[tokio::test(start_paused = true)]
async fn warnings_do_not_block() {
    let api = Arc::new(SimulatedTaskApi::new());
    let record = complete_record().with_stakeholders(["user1", "user2", "user1"]);

    let outcome = pipeline(api.clone())
        .synchronize(&record, &BatchOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.batch.tasks_created, 2);
}

#[test]
fn plan_is_gated_too() {
    let api = Arc::new(SimulatedTaskApi::new());
    let p = pipeline(api);
    let drafts = p.plan(&complete_record()).unwrap();
    assert_eq!(drafts.len(), 2);
    assert!(p
        .plan(&reqsync_document::RequirementsRecord::default())
        .unwrap_err()
        .is_validation());
}
