// src/storage/types.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use super::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub candidate_id: String,
    pub last_attendance_at: DateTime<Utc>,
    pub evidence_image: Option<Vec<u8>>,
}

impl AttendanceRecord {
    /// Applies an upsert. A missing evidence image keeps the stored one.
    pub fn apply(&mut self, at: DateTime<Utc>, evidence: Option<Vec<u8>>) {
        self.last_attendance_at = at;
        if evidence.is_some() {
            self.evidence_image = evidence;
        }
    }
}

/// Durable attendance state. Only the attendance recorder writes through this;
/// dashboards and other readers stick to the read operations.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn last_attendance(&self, candidate_id: &str) -> Result<Option<DateTime<Utc>>>;

    async fn upsert_attendance(
        &self,
        candidate_id: &str,
        at: DateTime<Utc>,
        evidence: Option<Vec<u8>>,
    ) -> Result<()>;

    /// Records whose last attendance falls on `day` (UTC), newest first.
    async fn attendance_on(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>>;
}

pub(crate) fn sort_newest_first(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| b.last_attendance_at.cmp(&a.last_attendance_at));
}
