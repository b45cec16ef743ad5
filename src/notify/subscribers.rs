// src/notify/subscribers.rs
use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::info;

use super::broadcaster::Subscriber;
use super::error::{DeliveryError, Result};
use super::types::AttendancePayload;

/// Forwards payloads into a bounded tokio channel without ever waiting on it.
pub struct ChannelSubscriber {
    name: String,
    sender: mpsc::Sender<AttendancePayload>,
}

impl ChannelSubscriber {
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<AttendancePayload>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                name: name.into(),
                sender,
            },
            receiver,
        )
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, payload: &AttendancePayload) -> Result<()> {
        self.sender.try_send(payload.clone()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Writes each payload as a JSON log line. Evidence bytes are left out.
pub struct LogSubscriber {
    name: String,
}

impl LogSubscriber {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Subscriber for LogSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, payload: &AttendancePayload) -> Result<()> {
        let evidence_bytes = payload.evidence_image.as_ref().map_or(0, Vec::len);
        let summary = AttendancePayload {
            evidence_image: None,
            ..payload.clone()
        };
        let line = serde_json::to_string(&summary)
            .map_err(|e| DeliveryError::Failed(e.to_string()))?;

        info!(subscriber = %self.name, evidence_bytes, "{}", line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_channel_subscriber_reports_full_queue() {
        let (subscriber, mut rx) = ChannelSubscriber::new("ui", 1);
        let payload = AttendancePayload::new("S1".into(), 0.9, Utc::now(), None);

        assert!(subscriber.deliver(&payload).await.is_ok());
        assert!(matches!(subscriber.deliver(&payload).await, Err(DeliveryError::Full)));

        rx.recv().await.unwrap();
        assert!(subscriber.deliver(&payload).await.is_ok());
    }

    #[tokio::test]
    async fn test_log_subscriber_accepts_payload() {
        let subscriber = LogSubscriber::new("console");
        let payload = AttendancePayload::new("S1".into(), 0.9, Utc::now(), Some(vec![0; 16]));

        assert!(subscriber.deliver(&payload).await.is_ok());
        assert!(!subscriber.is_closed());
    }
}
