// src/utils/monitoring.rs
use crate::utils::metrics::EngineMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Periodically logs the engine counters until the returned task is aborted.
pub fn spawn_reporter(metrics: Arc<EngineMetrics>, log_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(log_interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            log_metrics(&metrics);
        }
    })
}

fn log_metrics(metrics: &EngineMetrics) {
    let snapshot = metrics.snapshot();
    tracing::info!(
        uptime_secs = snapshot.uptime_secs,
        samples = snapshot.samples_observed,
        confirmations = snapshot.confirmations,
        throttled = snapshot.throttled,
        recorded = snapshot.recorded,
        already_attended = snapshot.already_attended,
        store_failures = snapshot.store_failures,
        dropped = snapshot.dropped,
        deliveries_failed = snapshot.deliveries_failed,
        "Engine metrics"
    );
}
