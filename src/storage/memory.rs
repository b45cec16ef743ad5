// src/storage/memory.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::errors::Result;
use super::types::{sort_newest_first, AttendanceRecord, AttendanceStore};

/// Process-local store, used when no durable backend is configured.
#[derive(Default)]
pub struct InMemoryAttendanceStore {
    records: RwLock<HashMap<String, AttendanceRecord>>,
    writes: AtomicUsize,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record without counting it as a write.
    pub fn insert(&self, record: AttendanceRecord) {
        self.records.write().insert(record.candidate_id.clone(), record);
    }

    pub fn get(&self, candidate_id: &str) -> Option<AttendanceRecord> {
        self.records.read().get(candidate_id).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn last_attendance(&self, candidate_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .records
            .read()
            .get(candidate_id)
            .map(|record| record.last_attendance_at))
    }

    async fn upsert_attendance(
        &self,
        candidate_id: &str,
        at: DateTime<Utc>,
        evidence: Option<Vec<u8>>,
    ) -> Result<()> {
        let mut records = self.records.write();
        records
            .entry(candidate_id.to_string())
            .and_modify(|record| record.apply(at, evidence.clone()))
            .or_insert_with(|| AttendanceRecord {
                candidate_id: candidate_id.to_string(),
                last_attendance_at: at,
                evidence_image: evidence.clone(),
            });
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn attendance_on(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self
            .records
            .read()
            .values()
            .filter(|record| record.last_attendance_at.date_naive() == day)
            .cloned()
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }
}
