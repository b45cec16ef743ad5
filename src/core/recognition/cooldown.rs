// src/core/recognition/cooldown.rs
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Throttles how often confirmations reach the recorder.
///
/// Entries are never evicted; staleness is decided when a candidate is checked.
pub struct CooldownRegistry {
    global_window: Duration,
    candidate_window: Duration,
    global_last_confirmed: Option<DateTime<Utc>>,
    last_confirmed: HashMap<String, DateTime<Utc>>,
}

impl CooldownRegistry {
    pub fn new(global_window: Duration, candidate_window: Duration) -> Self {
        Self {
            global_window,
            candidate_window,
            global_last_confirmed: None,
            last_confirmed: HashMap::new(),
        }
    }

    pub fn admit(&mut self, candidate_id: &str, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.global_last_confirmed {
            if now.signed_duration_since(last) < self.global_window {
                debug!(candidate_id, "Rejected by global cooldown");
                return false;
            }
        }

        if let Some(last) = self.last_confirmed.get(candidate_id) {
            if now.signed_duration_since(*last) < self.candidate_window {
                debug!(candidate_id, "Rejected by candidate cooldown");
                return false;
            }
        }

        self.global_last_confirmed = Some(now);
        self.last_confirmed.insert(candidate_id.to_string(), now);
        true
    }

    /// Undoes the admission granted at `at`, unless a later one replaced it.
    pub fn revoke(&mut self, candidate_id: &str, at: DateTime<Utc>) {
        if self.last_confirmed.get(candidate_id) == Some(&at) {
            self.last_confirmed.remove(candidate_id);
        }
        if self.global_last_confirmed == Some(at) {
            self.global_last_confirmed = None;
        }
    }

    pub fn last_confirmed(&self, candidate_id: &str) -> Option<DateTime<Utc>> {
        self.last_confirmed.get(candidate_id).copied()
    }

    pub fn global_last_confirmed(&self) -> Option<DateTime<Utc>> {
        self.global_last_confirmed
    }
}

impl Default for CooldownRegistry {
    fn default() -> Self {
        Self::new(Duration::seconds(3), Duration::seconds(10))
    }
}
