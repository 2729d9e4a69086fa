use std::sync::{Arc, Once};

use chrono::{NaiveDate, Utc};
use pretty_assertions::assert_eq;
use scanner_core::{ScanConfig, StopReason};
use scanner_engine::{
    CheckpointStore, FailureKind, FetchedCard, MemoryCardProvider, ProviderError, RunError,
    RunLimits, RunStop, ScanRunner, SessionCoordinator,
};
use tempfile::TempDir;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn runner(provider: Arc<MemoryCardProvider>, max_failures: u32) -> ScanRunner {
    let coordinator =
        SessionCoordinator::new(provider, ScanConfig::new(20, max_failures).unwrap());
    ScanRunner::new(coordinator)
}

#[tokio::test]
async fn run_collects_hits_until_end_of_profile() {
    init_logging();
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("alice", &[25, 3, 40, 1, 20]));

    let summary = runner(provider, 10).run("savee", "alice", 0).await.unwrap();

    assert_eq!(summary.stop, RunStop::EndOfProfile);
    assert_eq!(summary.steps, 6);
    let indices: Vec<_> = summary.hits.iter().map(|card| card.index()).collect();
    assert_eq!(indices, vec![0, 2, 4]);
    assert_eq!(summary.checkpoint.next_index, 5);
    assert_eq!(summary.checkpoint.hits, 3);
    assert_eq!(summary.checkpoint.consecutive_failures, 0);
}

#[tokio::test]
async fn run_stops_at_failure_ceiling() {
    init_logging();
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("bob", &[1, 2, 3, 4, 99]));

    let summary = runner(provider, 3).run("savee", "bob", 0).await.unwrap();

    assert_eq!(summary.stop, RunStop::NoHitsAfterLimit);
    assert_eq!(summary.steps, 3);
    assert_eq!(summary.checkpoint.next_index, 3);
    assert_eq!(summary.checkpoint.consecutive_failures, 3);
    assert!(summary.hits.is_empty());
}

#[tokio::test]
async fn interrupted_run_resumes_without_double_counting() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("carol.ron");
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("carol", &[1, 1, 30, 1, 1, 1]));

    let first = runner(provider.clone(), 4)
        .with_store(CheckpointStore::new(&path).unwrap())
        .with_limits(RunLimits {
            max_steps: Some(2),
            ..RunLimits::default()
        })
        .run("cosmos", "carol", 0)
        .await
        .unwrap();
    assert_eq!(first.stop, RunStop::StepLimit);
    assert_eq!(first.checkpoint.next_index, 2);
    assert_eq!(first.checkpoint.consecutive_failures, 2);

    // The start index is ignored once a checkpoint exists.
    let second = runner(provider, 4)
        .with_store(CheckpointStore::new(&path).unwrap())
        .run("cosmos", "carol", 0)
        .await
        .unwrap();
    assert_eq!(second.stop, RunStop::EndOfProfile);
    assert_eq!(second.hits.len(), 1);
    assert_eq!(second.hits[0].index(), 2);
    assert_eq!(second.checkpoint.next_index, 6);
    assert_eq!(second.checkpoint.consecutive_failures, 3);
    assert_eq!(second.checkpoint.hits, 1);

    let stored = CheckpointStore::new(&path).unwrap().load().unwrap().unwrap();
    assert_eq!(stored, second.checkpoint);
}

#[tokio::test]
async fn new_session_forgets_carried_failures() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("dave.ron");
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("dave", &[1, 1, 1, 1]));

    let first = runner(provider.clone(), 2)
        .with_store(CheckpointStore::new(&path).unwrap())
        .run("savee", "dave", 0)
        .await
        .unwrap();
    assert_eq!(first.stop, RunStop::NoHitsAfterLimit);
    assert_eq!(first.checkpoint.next_index, 2);

    let carried = runner(provider.clone(), 2)
        .with_store(CheckpointStore::new(&path).unwrap())
        .run("savee", "dave", 0)
        .await
        .unwrap();
    assert_eq!(carried.stop, RunStop::NoHitsAfterLimit);
    assert_eq!(carried.steps, 1);

    let fresh = runner(provider, 2)
        .with_store(CheckpointStore::new(&path).unwrap())
        .new_session(true)
        .run("savee", "dave", 0)
        .await
        .unwrap();
    assert_eq!(fresh.stop, RunStop::EndOfProfile);
    assert_eq!(fresh.steps, 2);
    assert_eq!(fresh.checkpoint.next_index, 4);
}

#[tokio::test]
async fn provider_failure_halts_run_and_keeps_cursor() {
    init_logging();
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("erin", &[50, 50]));
    provider.fail_with("erin", ProviderError::new(FailureKind::Network, "connection reset"));

    let summary = runner(provider, 5).run("savee", "erin", 1).await.unwrap();

    assert_eq!(
        summary.stop,
        RunStop::ProviderFailure(StopReason::ProviderUnavailable)
    );
    assert_eq!(summary.checkpoint.next_index, 1);
    assert_eq!(summary.steps, 1);
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

fn daily_limit(max: u64) -> RunLimits {
    RunLimits {
        daily_hits: Some(max),
        ..RunLimits::default()
    }
}

#[tokio::test]
async fn hit_limit_stops_run() {
    init_logging();
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("frank", &[30, 30, 30, 30]));

    let summary = runner(provider, 5)
        .with_limits(daily_limit(2))
        .with_today(day(16))
        .run("savee", "frank", 0)
        .await
        .unwrap();

    assert_eq!(summary.stop, RunStop::HitLimit);
    assert_eq!(summary.hits.len(), 2);
    assert_eq!(summary.checkpoint.next_index, 2);
    assert_eq!(summary.checkpoint.hits_today, 2);
}

#[tokio::test]
async fn daily_hit_limit_holds_across_resumes() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("frank.ron");
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("frank", &[30, 30, 30, 30, 30]));

    let first = runner(provider.clone(), 5)
        .with_store(CheckpointStore::new(&path).unwrap())
        .with_limits(RunLimits {
            daily_hits: Some(3),
            max_steps: Some(2),
        })
        .with_today(day(16))
        .run("savee", "frank", 0)
        .await
        .unwrap();
    assert_eq!(first.stop, RunStop::StepLimit);
    assert_eq!(first.hits.len(), 2);

    let same_day = runner(provider.clone(), 5)
        .with_store(CheckpointStore::new(&path).unwrap())
        .with_limits(daily_limit(3))
        .with_today(day(16))
        .run("savee", "frank", 0)
        .await
        .unwrap();
    assert_eq!(same_day.stop, RunStop::HitLimit);
    assert_eq!(same_day.hits.len(), 1);
    assert_eq!(same_day.checkpoint.next_index, 3);

    let next_day = runner(provider, 5)
        .with_store(CheckpointStore::new(&path).unwrap())
        .with_limits(daily_limit(3))
        .with_today(day(17))
        .run("savee", "frank", 0)
        .await
        .unwrap();
    assert_eq!(next_day.stop, RunStop::EndOfProfile);
    assert_eq!(next_day.hits.len(), 2);
    assert_eq!(next_day.checkpoint.hits_today, 2);
    assert_eq!(next_day.checkpoint.hits, 5);
}

#[tokio::test]
async fn malformed_hit_card_does_not_stall_run() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("kim.ron");
    let provider = Arc::new(MemoryCardProvider::new());
    let now = Utc::now();
    provider.push_card("kim", FetchedCard::new(99, Some("ftp://x/y".into()), now));
    provider.push_card("kim", FetchedCard::new(50, None, now));

    let summary = runner(provider, 5)
        .with_store(CheckpointStore::new(&path).unwrap())
        .run("savee", "kim", 0)
        .await
        .unwrap();

    assert_eq!(summary.stop, RunStop::EndOfProfile);
    let indices: Vec<_> = summary.hits.iter().map(|card| card.index()).collect();
    assert_eq!(indices, vec![1]);
    assert_eq!(summary.checkpoint.next_index, 2);
}

#[tokio::test]
async fn resume_with_lower_failure_ceiling_clamps_carried_failures() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("lee.ron");
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("lee", &[1, 1, 1, 1, 1, 1, 40]));

    let first = runner(provider.clone(), 5)
        .with_store(CheckpointStore::new(&path).unwrap())
        .run("savee", "lee", 0)
        .await
        .unwrap();
    assert_eq!(first.stop, RunStop::NoHitsAfterLimit);
    assert_eq!(first.checkpoint.next_index, 5);
    assert_eq!(first.checkpoint.consecutive_failures, 5);

    let lowered = runner(provider, 3)
        .with_store(CheckpointStore::new(&path).unwrap())
        .run("savee", "lee", 0)
        .await
        .unwrap();
    assert_eq!(lowered.stop, RunStop::NoHitsAfterLimit);
    assert_eq!(lowered.steps, 1);
    assert_eq!(lowered.checkpoint.next_index, 6);
    assert_eq!(lowered.checkpoint.consecutive_failures, 3);
}

#[tokio::test]
async fn cancelled_run_makes_no_progress() {
    init_logging();
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("gina", &[30]));
    let runner = runner(provider, 5);
    runner.cancellation().cancel();

    let summary = runner.run("savee", "gina", 0).await.unwrap();
    assert_eq!(summary.stop, RunStop::Cancelled);
    assert_eq!(summary.steps, 0);
    assert_eq!(summary.checkpoint.next_index, 0);
}

#[tokio::test]
async fn checkpoint_for_another_profile_is_refused() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("shared.ron");
    let provider = Arc::new(MemoryCardProvider::new().with_metrics("hank", &[1]));

    runner(provider.clone(), 5)
        .with_store(CheckpointStore::new(&path).unwrap())
        .run("savee", "hank", 0)
        .await
        .unwrap();

    let err = runner(provider, 5)
        .with_store(CheckpointStore::new(&path).unwrap())
        .run("savee", "ivy", 0)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::CheckpointMismatch { .. }));
}
