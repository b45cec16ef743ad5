// src/core/recognition/sample.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation per processed frame: the frame's best match, or nobody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub candidate_id: Option<String>,
    pub confidence: f32,
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
    /// Encoded face crop for the matched face, kept as check-in evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<u8>>,
}

impl Sample {
    pub fn matched(candidate_id: impl Into<String>, confidence: f32, observed_at: DateTime<Utc>) -> Self {
        Self {
            candidate_id: Some(candidate_id.into()),
            confidence,
            observed_at,
            evidence: None,
        }
    }

    pub fn unknown(observed_at: DateTime<Utc>) -> Self {
        Self {
            candidate_id: None,
            confidence: 0.0,
            observed_at,
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<u8>) -> Self {
        self.evidence = Some(evidence);
        self
    }
}
