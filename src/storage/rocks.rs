// src/storage/rocks.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rocksdb::{Options, DB};
use std::path::Path;
use std::sync::Arc;

use super::errors::{Result, StoreError};
use super::types::{sort_newest_first, AttendanceRecord, AttendanceStore};

const KEY_PREFIX: &str = "attendance/";

/// RocksDB-backed attendance store. Records are JSON encoded, one key per candidate.
pub struct RocksAttendanceStore {
    db: Arc<DB>,
}

impl RocksAttendanceStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path)
            .map_err(|e| StoreError::Misconfigured(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn key(candidate_id: &str) -> Vec<u8> {
        format!("{}{}", KEY_PREFIX, candidate_id).into_bytes()
    }

    // RocksDB calls block, so they run on the blocking pool.
    async fn run<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&DB) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || operation(&db))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

fn read_record(db: &DB, key: &[u8]) -> Result<Option<AttendanceRecord>> {
    let raw = match db.get(key)
        .map_err(|e| StoreError::DatabaseError(e.to_string()))? {
        Some(data) => data,
        None => return Ok(None),
    };

    let record = serde_json::from_slice(&raw)
        .map_err(|e| StoreError::InvalidFormat(e.to_string()))?;

    Ok(Some(record))
}

#[async_trait]
impl AttendanceStore for RocksAttendanceStore {
    async fn last_attendance(&self, candidate_id: &str) -> Result<Option<DateTime<Utc>>> {
        let key = Self::key(candidate_id);
        let record = self.run(move |db| read_record(db, &key)).await?;
        Ok(record.map(|r| r.last_attendance_at))
    }

    async fn upsert_attendance(
        &self,
        candidate_id: &str,
        at: DateTime<Utc>,
        evidence: Option<Vec<u8>>,
    ) -> Result<()> {
        let key = Self::key(candidate_id);
        let candidate_id = candidate_id.to_string();

        self.run(move |db| {
            let record = match read_record(db, &key)? {
                Some(mut existing) => {
                    existing.apply(at, evidence);
                    existing
                }
                None => AttendanceRecord {
                    candidate_id,
                    last_attendance_at: at,
                    evidence_image: evidence,
                },
            };

            let serialized = serde_json::to_vec(&record)
                .map_err(|e| StoreError::InvalidFormat(e.to_string()))?;

            db.put(&key, serialized)
                .map_err(|e| StoreError::DatabaseError(e.to_string()))
        })
        .await
    }

    async fn attendance_on(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        self.run(move |db| {
            let prefix = KEY_PREFIX.as_bytes();
            let mut records = Vec::new();

            for item in db.prefix_iterator(prefix) {
                let (key, value) = item
                    .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
                if !key.starts_with(prefix) {
                    break;
                }

                let record: AttendanceRecord = serde_json::from_slice(&value)
                    .map_err(|e| StoreError::InvalidFormat(e.to_string()))?;
                if record.last_attendance_at.date_naive() == day {
                    records.push(record);
                }
            }

            sort_newest_first(&mut records);
            Ok(records)
        })
        .await
    }
}
