//! End-to-end batch synchronization against scripted services, on paused time.

use pretty_assertions::assert_eq;
use reqsync_resilience::{CircuitState, RemoteError};
use reqsync_sync::{
    BatchOptions, BatchSynchronizer, BreakerSettings, FailureCategory, RetrySettings,
    SharedResilience, SyncConfig, SyncProgress, CREATE_TASK_OPERATION,
};
use reqsync_test_utils::{stories, test_credentials, CountingAuthProvider, ScriptedTaskApi};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn fast_config() -> SyncConfig {
    SyncConfig::default().with_retry(RetrySettings {
        max_retries: 3,
        base_delay_ms: 10,
        max_delay_ms: 40,
    })
}

struct Harness {
    api: Arc<ScriptedTaskApi>,
    provider: Arc<CountingAuthProvider>,
    shared: SharedResilience,
    synchronizer: BatchSynchronizer,
}

fn harness(config: &SyncConfig, api: ScriptedTaskApi) -> Harness {
    let api = Arc::new(api);
    let provider = Arc::new(CountingAuthProvider::default());
    let shared = SharedResilience::from_config(config);
    let synchronizer = BatchSynchronizer::new(config, api.clone(), provider.clone(), &shared)
        .with_credentials(test_credentials());
    Harness {
        api,
        provider,
        shared,
        synchronizer,
    }
}

/// Options whose progress callback records `completed` counts
fn recording_options(batch_size: usize) -> (BatchOptions, Arc<Mutex<Vec<usize>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = BatchOptions::new(batch_size, Duration::ZERO)
        .with_progress(move |progress| sink.lock().unwrap().push(progress.completed));
    (options, seen)
}

#[tokio::test(start_paused = true)]
async fn five_items_in_batches_of_two() {
    let h = harness(&fast_config(), ScriptedTaskApi::new());
    let seen = Arc::new(Mutex::new(Vec::<SyncProgress>::new()));
    let sink = Arc::clone(&seen);
    let options = BatchOptions::new(2, Duration::from_millis(500))
        .with_progress(move |progress| sink.lock().unwrap().push(progress));

    let start = Instant::now();
    let outcome = h
        .synchronizer
        .create_tasks_batch(&stories(5), &options)
        .await
        .unwrap();

    assert_eq!(outcome.batches, 3);
    assert_eq!(outcome.tasks_created, 5);
    assert!(outcome.is_complete());
    // Two pauses: none after the last batch.
    assert!(start.elapsed() >= Duration::from_millis(1000));
    assert!(start.elapsed() < Duration::from_millis(1500));
    assert!(outcome.total_time >= Duration::from_millis(1000));

    let progress = seen.lock().unwrap().clone();
    let completed: Vec<usize> = progress.iter().map(|p| p.completed).collect();
    assert_eq!(completed, vec![1, 2, 3, 4, 5]);
    assert!(progress.iter().all(|p| p.total == 5 && (0.0..=100.0).contains(&p.percentage)));
    assert!((progress[4].percentage - 100.0).abs() < f64::EPSILON);

    assert_eq!(
        h.api.titles(),
        vec!["Story 1", "Story 2", "Story 3", "Story 4", "Story 5"]
    );
    assert_eq!(h.provider.issued(), 1);
    assert_eq!(
        h.shared.tokens.get(&test_credentials().cache_key()).as_deref(),
        Some("token-1")
    );
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let api = ScriptedTaskApi::new().then_fail_times(2, &RemoteError::http(503, "busy"));
    let h = harness(&fast_config(), api);

    let outcome = h
        .synchronizer
        .create_tasks_batch(&stories(3), &BatchOptions::new(10, Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(outcome.tasks_created, 3);
    assert_eq!(h.api.call_count(), 5);
    assert_eq!(h.api.titles()[..3], ["Story 1", "Story 1", "Story 1"]);
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_is_recorded_and_batch_continues() {
    let api = ScriptedTaskApi::new()
        .then_succeed()
        .then_fail(RemoteError::http(400, "missing field"));
    let h = harness(&fast_config(), api);
    let (options, seen) = recording_options(2);

    let outcome = h
        .synchronizer
        .create_tasks_batch(&stories(4), &options)
        .await
        .unwrap();

    assert_eq!(outcome.tasks_created, 3);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.index, 1);
    assert_eq!(failure.report.category, FailureCategory::Rejected);
    assert_eq!(failure.report.item, "#2 Story 2");
    assert!(failure
        .report
        .to_string()
        .starts_with("[rejected] create task failed for '#2 Story 2': HTTP 400: missing field."));
    // No retries for a 400.
    assert_eq!(h.api.call_count(), 4);
    let created: Vec<usize> = outcome.created.iter().map(|c| c.index).collect();
    assert_eq!(created, vec![0, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn expired_token_is_refreshed_once() {
    let api = ScriptedTaskApi::new().then_fail(RemoteError::http(401, "token expired"));
    let h = harness(&fast_config(), api);

    let outcome = h
        .synchronizer
        .create_tasks_batch(&stories(1), &BatchOptions::new(1, Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(outcome.tasks_created, 1);
    assert_eq!(h.provider.issued(), 2);
    let tokens: Vec<String> = h.api.calls().into_iter().map(|(token, _)| token).collect();
    assert_eq!(tokens, vec!["token-1", "token-2"]);
}

#[tokio::test(start_paused = true)]
async fn persistent_unauthorized_is_authentication_failure() {
    let api = ScriptedTaskApi::new().then_fail_times(2, &RemoteError::http(401, "no"));
    let h = harness(&fast_config(), api);

    let outcome = h
        .synchronizer
        .create_tasks_batch(&stories(1), &BatchOptions::new(1, Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(outcome.tasks_created, 0);
    assert_eq!(outcome.failures[0].report.category, FailureCategory::Authentication);
    assert_eq!(h.api.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn open_circuit_short_circuits_remaining_items() {
    let config = fast_config()
        .with_retry(RetrySettings {
            max_retries: 0,
            base_delay_ms: 10,
            max_delay_ms: 10,
        })
        .with_breaker(BreakerSettings {
            failure_threshold: 2,
            recovery_timeout_secs: 30,
        });
    let api = ScriptedTaskApi::new().then_fail_times(10, &RemoteError::http(503, "down"));
    let h = harness(&config, api);
    let (options, seen) = recording_options(5);

    let outcome = h
        .synchronizer
        .create_tasks_batch(&stories(5), &options)
        .await
        .unwrap();

    assert_eq!(outcome.tasks_created, 0);
    // Short-circuited items still report progress.
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    let categories: Vec<FailureCategory> =
        outcome.failures.iter().map(|f| f.report.category).collect();
    assert_eq!(
        categories,
        vec![
            FailureCategory::Transient,
            FailureCategory::Transient,
            FailureCategory::ServiceUnavailable,
            FailureCategory::ServiceUnavailable,
            FailureCategory::ServiceUnavailable,
        ]
    );
    assert_eq!(h.api.call_count(), 2);
    assert_eq!(
        h.shared.breakers.breaker(CREATE_TASK_OPERATION).state(),
        CircuitState::Open
    );
}

#[tokio::test(start_paused = true)]
async fn breaker_state_is_shared_between_synchronizers() {
    let config = fast_config()
        .with_retry(RetrySettings {
            max_retries: 0,
            base_delay_ms: 10,
            max_delay_ms: 10,
        })
        .with_breaker(BreakerSettings {
            failure_threshold: 1,
            recovery_timeout_secs: 30,
        });
    let failing = ScriptedTaskApi::new().then_fail(RemoteError::transport("reset"));
    let h = harness(&config, failing);
    h.synchronizer
        .create_tasks_batch(&stories(1), &BatchOptions::new(1, Duration::ZERO))
        .await
        .unwrap();

    let healthy = Arc::new(ScriptedTaskApi::new());
    let second = BatchSynchronizer::new(
        &config,
        healthy.clone(),
        Arc::new(CountingAuthProvider::default()),
        &h.shared,
    );
    let outcome = second
        .create_tasks_batch(&stories(1), &BatchOptions::new(1, Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(outcome.failures[0].report.category, FailureCategory::ServiceUnavailable);
    assert_eq!(healthy.call_count(), 0);

    tokio::time::advance(Duration::from_secs(30)).await;
    let recovered = second
        .create_tasks_batch(&stories(1), &BatchOptions::new(1, Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(recovered.tasks_created, 1);
}

#[tokio::test(start_paused = true)]
async fn every_attempt_is_rate_limited() {
    let config = fast_config().with_rate_limit(reqsync_sync::RateLimitSettings {
        requests_per_second: 2.0,
        burst_size: 1,
    });
    let h = harness(&config, ScriptedTaskApi::new());

    let start = Instant::now();
    h.synchronizer
        .create_tasks_batch(&stories(3), &BatchOptions::new(10, Duration::ZERO))
        .await
        .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(999));
}

#[tokio::test(start_paused = true)]
async fn zero_batch_size_is_rejected() {
    let h = harness(&fast_config(), ScriptedTaskApi::new());
    let err = h
        .synchronizer
        .create_tasks_batch(&stories(2), &BatchOptions::new(0, Duration::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, reqsync_sync::SyncError::InvalidOptions(_)));
    assert_eq!(h.api.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_input_creates_nothing() {
    let h = harness(&fast_config(), ScriptedTaskApi::new());
    let outcome = h
        .synchronizer
        .create_tasks_batch(&[], &BatchOptions::new(2, Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(outcome.batches, 0);
    assert_eq!(outcome.tasks_created, 0);
    assert_eq!(outcome.total_time, Duration::ZERO);
}
