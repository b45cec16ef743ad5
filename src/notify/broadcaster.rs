// src/notify/broadcaster.rs
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::{DeliveryError, Result};
use super::types::{AttendancePayload, DeliveryReport, SubscriberId};
use crate::utils::metrics::EngineMetrics;

#[async_trait]
pub trait Subscriber: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, payload: &AttendancePayload) -> Result<()>;

    /// A closed subscriber is dropped before the next publish. A subscriber that
    /// only failed a delivery stays registered.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Best-effort fan-out of attendance payloads. Delivery failures never reach the
/// caller, and one slow or broken subscriber does not hold up the others.
pub struct EventBroadcaster {
    subscribers: RwLock<Vec<(SubscriberId, Arc<dyn Subscriber>)>>,
    delivery_timeout: Duration,
    metrics: Arc<EngineMetrics>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl EventBroadcaster {
    pub fn new(delivery_timeout: Duration, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            delivery_timeout,
            metrics,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(Uuid::new_v4());
        info!(subscriber = subscriber.name(), "Subscriber registered");
        self.subscribers.write().push((id, subscriber));
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Fire-and-forget. The handle only exists for callers that want the tally.
    pub fn publish(&self, payload: AttendancePayload) -> JoinHandle<DeliveryReport> {
        let targets = self.live_subscribers();
        let timeout = self.delivery_timeout;
        let metrics = self.metrics.clone();
        let in_flight = self.in_flight.clone();
        let idle = self.idle.clone();

        in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let event_id = payload.event_id;
            let report = deliver_all(targets, Arc::new(payload), timeout).await;
            if report.failed > 0 {
                metrics.record_delivery_failures(report.failed as u64);
            }
            debug!(
                event_id = %event_id,
                delivered = report.delivered,
                failed = report.failed,
                "Attendance payload published"
            );

            if in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                idle.notify_one();
            }
            report
        })
    }

    /// Waits up to `within` for outstanding publishes. Returns `false` if some
    /// were still running when the wait ran out.
    pub async fn drain(&self, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if self.in_flight() == 0 {
                return true;
            }
            if tokio::time::timeout_at(deadline, self.idle.notified()).await.is_err() {
                let pending = self.in_flight();
                if pending > 0 {
                    warn!(pending, "Gave up waiting for attendance deliveries");
                }
                return pending == 0;
            }
        }
    }

    fn live_subscribers(&self) -> Vec<Arc<dyn Subscriber>> {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|(_, subscriber)| {
            let closed = subscriber.is_closed();
            if closed {
                info!(subscriber = subscriber.name(), "Dropping closed subscriber");
            }
            !closed
        });
        subscribers.iter().map(|(_, subscriber)| subscriber.clone()).collect()
    }
}

/// Each delivery runs on its own task, so a subscriber that panics only loses
/// its own copy.
async fn deliver_all(
    targets: Vec<Arc<dyn Subscriber>>,
    payload: Arc<AttendancePayload>,
    timeout: Duration,
) -> DeliveryReport {
    let deliveries = targets.into_iter().map(|subscriber| {
        let payload = payload.clone();
        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, subscriber.deliver(&payload)).await {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::Timeout(timeout)),
            };
            if let Err(e) = &outcome {
                warn!(subscriber = subscriber.name(), error = %e, "Attendance delivery failed");
            }
            outcome.is_ok()
        })
    });

    let results = join_all(deliveries).await;
    let delivered = results
        .iter()
        .filter(|result| match result {
            Ok(ok) => *ok,
            Err(e) => {
                error!(error = %e, "Attendance delivery task aborted");
                false
            }
        })
        .count();

    DeliveryReport {
        delivered,
        failed: results.len() - delivered,
    }
}
