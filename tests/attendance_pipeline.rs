mod common;

use chrono::Duration;
use common::*;
use rollcall::{
    core::{recognition::Sample, services::AttendanceOutcome},
    notify::ChannelSubscriber,
    storage::{AttendanceStore, InMemoryAttendanceStore},
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_test::assert_ok;

#[test_log::test(tokio::test)]
async fn test_confirmed_scenario_records_and_notifies() {
    let store = Arc::new(InMemoryAttendanceStore::new());
    let app = app_with_store(test_config(), store.clone());
    let (subscriber, mut payloads) = ChannelSubscriber::new("dashboard", 8);
    app.broadcaster().subscribe(Arc::new(subscriber));

    let engine = app.engine();
    let mut outcomes = engine.subscribe_outcomes();

    assert_ok!(engine.observe(Sample::matched("S1", 0.85, at(0))).await);
    assert_ok!(engine.observe(Sample::matched("S1", 0.9, at(500))).await);
    assert_ok!(engine.observe(Sample::matched("S1", 0.88, at(1100))).await);

    assert_eq!(
        next_outcome(&mut outcomes).await,
        AttendanceOutcome::Recorded {
            candidate_id: "S1".into(),
            confidence: 0.88,
            at: at(1100),
        }
    );

    let payload = tokio::time::timeout(std::time::Duration::from_secs(2), payloads.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload.candidate_id, "S1");
    assert_eq!(payload.confirmed_at, at(1100));

    assert_ok!(app.shutdown().await);
    assert!(payloads.recv().await.is_none());
    assert_eq!(store.write_count(), 1);
}

#[test_log::test(tokio::test)]
async fn test_broadcast_failure_does_not_affect_recording() {
    let store = Arc::new(InMemoryAttendanceStore::new());
    let app = app_with_store(test_config(), store.clone());
    let flaky = Arc::new(FlakySubscriber::default());
    app.broadcaster().subscribe(flaky.clone());

    let engine = app.engine();
    let mut outcomes = engine.subscribe_outcomes();

    hold(&engine, "S1", 0).await;
    assert!(matches!(
        next_outcome(&mut outcomes).await,
        AttendanceOutcome::Recorded { ref candidate_id, .. } if candidate_id == "S1"
    ));

    // Past the global window, different candidate.
    hold(&engine, "S2", 5_000).await;
    assert!(matches!(
        next_outcome(&mut outcomes).await,
        AttendanceOutcome::Recorded { ref candidate_id, .. } if candidate_id == "S2"
    ));

    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while flaky.calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let delivered = flaky.delivered.lock().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].candidate_id, "S2");

    assert_ok!(app.shutdown().await);
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn test_durable_dedup_across_days() {
    let store = Arc::new(InMemoryAttendanceStore::new());
    let app = app_with_store(test_config(), store.clone());
    let engine = app.engine();
    let mut outcomes = engine.subscribe_outcomes();

    let hour = Duration::hours(1).num_milliseconds();

    hold(&engine, "S1", 0).await;
    assert!(matches!(next_outcome(&mut outcomes).await, AttendanceOutcome::Recorded { .. }));

    hold(&engine, "S1", 23 * hour).await;
    assert_eq!(
        next_outcome(&mut outcomes).await,
        AttendanceOutcome::AlreadyAttended {
            candidate_id: "S1".into(),
            previous_at: at(1000),
        }
    );
    assert_eq!(store.write_count(), 1);

    hold(&engine, "S1", 25 * hour).await;
    assert_eq!(
        next_outcome(&mut outcomes).await,
        AttendanceOutcome::Recorded {
            candidate_id: "S1".into(),
            confidence: 0.9,
            at: at(25 * hour + 1000),
        }
    );

    assert_ok!(app.shutdown().await);
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn test_per_candidate_cooldown_suppresses_second_hold() {
    let store = Arc::new(InMemoryAttendanceStore::new());
    let app = app_with_store(test_config(), store.clone());
    let engine = app.engine();

    hold(&engine, "S1", 0).await;
    // Outside the 3s global window but inside S1's 10s window.
    hold(&engine, "S1", 4_000).await;
    wait_for_samples(&engine, 6).await;

    let last = engine.snapshot().last_confirmation.unwrap();
    assert_eq!(last.candidate_id, "S1");
    assert!(!last.admitted);

    assert_ok!(app.shutdown().await);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_write_failure_keeps_cooldown_by_default() {
    let store = Arc::new(FaultyStore::default());
    store.fail_writes.store(true, Ordering::SeqCst);
    let app = app_with_store(test_config(), store.clone());
    let engine = app.engine();
    let mut outcomes = engine.subscribe_outcomes();

    hold(&engine, "S1", 0).await;
    assert!(matches!(next_outcome(&mut outcomes).await, AttendanceOutcome::Failed { .. }));

    store.fail_writes.store(false, Ordering::SeqCst);
    hold(&engine, "S1", 4_000).await;
    wait_for_samples(&engine, 6).await;

    assert!(!engine.snapshot().last_confirmation.unwrap().admitted);
    assert_ok!(app.shutdown().await);
    assert!(store.inner.get("S1").is_none());
}

#[tokio::test]
async fn test_write_failure_rollback_allows_retry() {
    let mut config = test_config();
    config.cooldown.rollback_on_write_failure = true;

    let store = Arc::new(FaultyStore::default());
    store.fail_writes.store(true, Ordering::SeqCst);
    let app = app_with_store(config, store.clone());
    let engine = app.engine();
    let mut outcomes = engine.subscribe_outcomes();

    hold(&engine, "S1", 0).await;
    assert!(matches!(next_outcome(&mut outcomes).await, AttendanceOutcome::Failed { .. }));

    store.fail_writes.store(false, Ordering::SeqCst);
    // Inside both windows had the admission stood.
    hold(&engine, "S1", 1_500).await;
    assert_eq!(
        next_outcome(&mut outcomes).await,
        AttendanceOutcome::Recorded {
            candidate_id: "S1".into(),
            confidence: 0.9,
            at: at(2_500),
        }
    );

    assert_ok!(app.shutdown().await);
    assert!(store.inner.get("S1").is_some());
}

#[tokio::test]
async fn test_read_failure_drops_confirmation() {
    let store = Arc::new(FaultyStore::default());
    store.fail_reads.store(true, Ordering::SeqCst);
    let app = app_with_store(test_config(), store.clone());
    let engine = app.engine();
    let mut outcomes = engine.subscribe_outcomes();

    hold(&engine, "S1", 0).await;
    match next_outcome(&mut outcomes).await {
        AttendanceOutcome::Failed { candidate_id, error, .. } => {
            assert_eq!(candidate_id, "S1");
            assert!(error.contains("read refused"));
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let metrics = app.metrics();
    assert_eq!(metrics.store_failures, 1);
    assert_eq!(metrics.recorded, 0);

    assert_ok!(app.shutdown().await);
    assert_eq!(store.inner.write_count(), 0);
}

#[tokio::test]
async fn test_dashboard_listing_reads_today() {
    let store = Arc::new(InMemoryAttendanceStore::new());
    let app = app_with_store(test_config(), store.clone());
    let engine = app.engine();
    let mut outcomes = engine.subscribe_outcomes();

    hold(&engine, "S1", 0).await;
    next_outcome(&mut outcomes).await;
    hold(&engine, "S2", 20_000).await;
    next_outcome(&mut outcomes).await;

    let today = app.attendance_on(t0().date_naive()).await.unwrap();
    let ids: Vec<_> = today.iter().map(|r| r.candidate_id.as_str()).collect();
    assert_eq!(ids, vec!["S2", "S1"]);

    let yesterday = (t0() - Duration::days(1)).date_naive();
    assert!(store.attendance_on(yesterday).await.unwrap().is_empty());

    assert_ok!(app.shutdown().await);
}

#[tokio::test]
async fn test_shutdown_flushes_pending_deliveries() {
    let store = Arc::new(InMemoryAttendanceStore::new());
    let app = app_with_store(test_config(), store.clone());
    let slow = Arc::new(SlowSubscriber::new(std::time::Duration::from_millis(200)));
    app.broadcaster().subscribe(slow.clone());

    let engine = app.engine();
    let mut outcomes = engine.subscribe_outcomes();

    hold(&engine, "S1", 0).await;
    assert!(matches!(next_outcome(&mut outcomes).await, AttendanceOutcome::Recorded { .. }));
    let broadcaster = app.broadcaster().clone();

    assert_ok!(app.shutdown().await);

    assert_eq!(broadcaster.in_flight(), 0);
    let delivered = slow.delivered.lock().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].candidate_id, "S1");
}
