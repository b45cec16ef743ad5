// src/core/attendance/recorder.rs
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::storage::{AttendanceStore, StoreError};
use crate::utils::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordResult {
    Recorded(DateTime<Utc>),
    AlreadyAttended(DateTime<Utc>),
}

/// The only writer of attendance state. Enforces the durable dedup window.
pub struct AttendanceRecorder {
    store: Arc<dyn AttendanceStore>,
    dedup_window: Duration,
    store_timeout: std::time::Duration,
}

impl AttendanceRecorder {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        dedup_window: Duration,
        store_timeout: std::time::Duration,
    ) -> Self {
        Self {
            store,
            dedup_window,
            store_timeout,
        }
    }

    pub async fn record(
        &self,
        candidate_id: &str,
        evidence: Option<Vec<u8>>,
        now: DateTime<Utc>,
    ) -> Result<RecordResult> {
        let last = self
            .bounded(self.store.last_attendance(candidate_id))
            .await
            .map_err(|source| EngineError::AttendanceRead {
                candidate_id: candidate_id.to_string(),
                source,
            })?;

        if let Some(previous) = last {
            if now.signed_duration_since(previous) < self.dedup_window {
                info!(candidate_id, previous = %previous, "Already attended");
                return Ok(RecordResult::AlreadyAttended(previous));
            }
        }

        self.bounded(self.store.upsert_attendance(candidate_id, now, evidence))
            .await
            .map_err(|source| {
                warn!(candidate_id, error = %source, "Attendance write failed");
                EngineError::AttendanceWrite {
                    candidate_id: candidate_id.to_string(),
                    source,
                }
            })?;

        info!(candidate_id, at = %now, "Attendance recorded");
        Ok(RecordResult::Recorded(now))
    }

    async fn bounded<T, F>(&self, operation: F) -> std::result::Result<T, StoreError>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))?
    }
}
