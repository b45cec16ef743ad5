// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rollcall::{
    core::{
        recognition::Sample,
        services::{AttendanceOutcome, EngineHandle},
    },
    notify::{AttendancePayload, DeliveryError, Subscriber},
    storage::{self, AttendanceRecord, AttendanceStore, InMemoryAttendanceStore, StoreError},
    utils::config::Config,
    Application,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

pub fn at(millis: i64) -> DateTime<Utc> {
    t0() + Duration::milliseconds(millis)
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.notifications.metrics_interval_secs = 0;
    config
}

pub fn app_with_store(config: Config, store: Arc<dyn AttendanceStore>) -> Application {
    Application::with_store(Arc::new(config), store)
}

/// Feeds a full hold for `candidate` starting at `start_ms`.
pub async fn hold(handle: &EngineHandle, candidate: &str, start_ms: i64) {
    for offset in [0, 500, 1000] {
        handle
            .observe(Sample::matched(candidate, 0.9, at(start_ms + offset)))
            .await
            .unwrap();
    }
}

/// Waits until the engine has applied `count` samples.
pub async fn wait_for_samples(handle: &EngineHandle, count: u64) {
    let mut watcher = handle.watch_snapshot();
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while watcher.borrow_and_update().samples_observed < count {
            watcher.changed().await.unwrap();
        }
    })
    .await
    .expect("engine did not apply samples in time");
}

pub async fn next_outcome(rx: &mut broadcast::Receiver<AttendanceOutcome>) -> AttendanceOutcome {
    tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .expect("no outcome in time")
        .unwrap()
}

/// In-memory store whose reads or writes can be switched to fail.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryAttendanceStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

#[async_trait]
impl AttendanceStore for FaultyStore {
    async fn last_attendance(&self, candidate_id: &str) -> storage::Result<Option<DateTime<Utc>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read refused".into()));
        }
        self.inner.last_attendance(candidate_id).await
    }

    async fn upsert_attendance(
        &self,
        candidate_id: &str,
        at: DateTime<Utc>,
        evidence: Option<Vec<u8>>,
    ) -> storage::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::DatabaseError("write refused".into()));
        }
        self.inner.upsert_attendance(candidate_id, at, evidence).await
    }

    async fn attendance_on(&self, day: NaiveDate) -> storage::Result<Vec<AttendanceRecord>> {
        self.inner.attendance_on(day).await
    }
}

/// Fails its first delivery, then succeeds.
#[derive(Default)]
pub struct FlakySubscriber {
    pub calls: AtomicUsize,
    pub delivered: parking_lot::Mutex<Vec<AttendancePayload>>,
}

#[async_trait]
impl Subscriber for FlakySubscriber {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn deliver(&self, payload: &AttendancePayload) -> Result<(), DeliveryError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(DeliveryError::Failed("first delivery always fails".into()));
        }
        self.delivered.lock().push(payload.clone());
        Ok(())
    }
}

/// Takes `delay` to accept each payload.
pub struct SlowSubscriber {
    pub delay: std::time::Duration,
    pub delivered: parking_lot::Mutex<Vec<AttendancePayload>>,
}

impl SlowSubscriber {
    pub fn new(delay: std::time::Duration) -> Self {
        Self {
            delay,
            delivered: parking_lot::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Subscriber for SlowSubscriber {
    fn name(&self) -> &str {
        "slow"
    }

    async fn deliver(&self, payload: &AttendancePayload) -> Result<(), DeliveryError> {
        tokio::time::sleep(self.delay).await;
        self.delivered.lock().push(payload.clone());
        Ok(())
    }
}
