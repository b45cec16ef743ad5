// src/core/recognition/tracker.rs
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use super::sample::Sample;

#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    /// Confidence must be strictly above this to hold.
    pub threshold: f32,
    pub hold: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            hold: Duration::seconds(1),
        }
    }
}

/// The single global track slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerState {
    pub candidate_id: String,
    /// Latest confidence for the tracked candidate, not the maximum seen.
    pub confidence: f32,
    pub hold_started_at: DateTime<Utc>,
    #[serde(skip)]
    pub evidence: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub candidate_id: String,
    pub confidence: f32,
    pub confirmed_at: DateTime<Utc>,
    pub evidence: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    NoChange,
    Confirmed(Confirmation),
}

/// Promotes a candidate once it has stayed above threshold for the hold duration.
///
/// Confirmation is edge-triggered: the slot is emptied on every `Confirmed`, so a
/// subject lingering in frame has to complete a fresh hold before confirming again.
pub struct ConfirmationTracker {
    settings: TrackerSettings,
    state: Option<TrackerState>,
}

impl ConfirmationTracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            state: None,
        }
    }

    pub fn state(&self) -> Option<&TrackerState> {
        self.state.as_ref()
    }

    pub fn observe(&mut self, sample: Sample) -> Decision {
        let candidate_id = match sample.candidate_id {
            Some(id) if sample.confidence > self.settings.threshold => id,
            _ => {
                // The frame's best match is not a confident one, so whoever we were
                // holding is no longer among the live matches.
                if let Some(state) = self.state.take() {
                    debug!(candidate_id = %state.candidate_id, "Hold lost");
                }
                return Decision::NoChange;
            }
        };

        let state = match self.state.as_mut() {
            Some(state) if state.candidate_id == candidate_id => state,
            _ => {
                debug!(
                    candidate_id = %candidate_id,
                    confidence = sample.confidence,
                    "Hold started"
                );
                self.state = Some(TrackerState {
                    candidate_id,
                    confidence: sample.confidence,
                    hold_started_at: sample.observed_at,
                    evidence: sample.evidence,
                });
                return Decision::NoChange;
            }
        };

        state.confidence = sample.confidence;
        if state.evidence.is_none() {
            state.evidence = sample.evidence;
        }

        let held_for = sample.observed_at.signed_duration_since(state.hold_started_at);
        if held_for < self.settings.hold {
            return Decision::NoChange;
        }

        match self.state.take() {
            Some(state) => Decision::Confirmed(Confirmation {
                candidate_id: state.candidate_id,
                confidence: state.confidence,
                confirmed_at: sample.observed_at,
                evidence: state.evidence,
            }),
            None => Decision::NoChange,
        }
    }
}

impl Default for ConfirmationTracker {
    fn default() -> Self {
        Self::new(TrackerSettings::default())
    }
}
