// src/utils/metrics.rs
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

/// Counters shared by the engine task, the recorder worker and the broadcaster.
pub struct EngineMetrics {
    start_time: Instant,
    samples_observed: AtomicU64,
    confirmations: AtomicU64,
    admitted: AtomicU64,
    throttled: AtomicU64,
    recorded: AtomicU64,
    already_attended: AtomicU64,
    store_failures: AtomicU64,
    dropped: AtomicU64,
    deliveries_failed: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub samples_observed: u64,
    pub confirmations: u64,
    pub admitted: u64,
    pub throttled: u64,
    pub recorded: u64,
    pub already_attended: u64,
    pub store_failures: u64,
    pub dropped: u64,
    pub deliveries_failed: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            samples_observed: AtomicU64::new(0),
            confirmations: AtomicU64::new(0),
            admitted: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
            recorded: AtomicU64::new(0),
            already_attended: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            deliveries_failed: AtomicU64::new(0),
        }
    }

    pub fn record_sample(&self) {
        self.samples_observed.fetch_add(1, Ordering::Relaxed);
    }

    /// A confirmation either passes the cooldown registry or is throttled.
    pub fn record_confirmation(&self, admitted: bool) {
        self.confirmations.fetch_add(1, Ordering::Relaxed);
        if admitted {
            self.admitted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.throttled.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_recorded(&self) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_already_attended(&self) {
        self.already_attended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failures(&self, count: u64) {
        self.deliveries_failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            samples_observed: self.samples_observed.load(Ordering::Relaxed),
            confirmations: self.confirmations.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            recorded: self.recorded.load(Ordering::Relaxed),
            already_attended: self.already_attended.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_counters() {
        let metrics = EngineMetrics::new();
        metrics.record_confirmation(true);
        metrics.record_confirmation(false);
        metrics.record_confirmation(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.confirmations, 3);
        assert_eq!(snapshot.admitted, 1);
        assert_eq!(snapshot.throttled, 2);
    }
}
