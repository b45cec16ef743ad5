// src/notify/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What observers receive for every recorded attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendancePayload {
    pub event_id: Uuid,
    pub candidate_id: String,
    pub confidence: f32,
    pub confirmed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_image: Option<Vec<u8>>,
}

impl AttendancePayload {
    pub fn new(
        candidate_id: String,
        confidence: f32,
        confirmed_at: DateTime<Utc>,
        evidence_image: Option<Vec<u8>>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            candidate_id,
            confidence,
            confirmed_at,
            evidence_image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub Uuid);

/// Per-publish delivery tally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}
