// src/core/services/engine.rs
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    core::{
        attendance::{AttendanceRecorder, RecordResult},
        recognition::{
            cooldown::CooldownRegistry,
            sample::Sample,
            tracker::{Confirmation, ConfirmationTracker, Decision, TrackerSettings},
        },
    },
    notify::{AttendancePayload, EventBroadcaster},
    utils::{
        config::Config,
        error::{EngineError, Result},
        metrics::EngineMetrics,
    },
};

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tracker: TrackerSettings,
    pub global_cooldown: Duration,
    pub candidate_cooldown: Duration,
    pub sample_queue_capacity: usize,
    pub recorder_queue_capacity: usize,
    pub rollback_on_write_failure: bool,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tracker: TrackerSettings {
                threshold: config.engine.track_threshold as f32,
                hold: config.hold_duration(),
            },
            global_cooldown: config.global_cooldown(),
            candidate_cooldown: config.candidate_cooldown(),
            sample_queue_capacity: config.engine.sample_queue_capacity,
            recorder_queue_capacity: config.attendance.recorder_queue_capacity,
            rollback_on_write_failure: config.cooldown.rollback_on_write_failure,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What became of a confirmation that passed the cooldown registry.
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceOutcome {
    Recorded {
        candidate_id: String,
        confidence: f32,
        at: DateTime<Utc>,
    },
    AlreadyAttended {
        candidate_id: String,
        previous_at: DateTime<Utc>,
    },
    Failed {
        candidate_id: String,
        confirmed_at: DateTime<Utc>,
        error: String,
    },
    /// The recorder queue was full; nothing was written.
    Dropped {
        candidate_id: String,
        confirmed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedCandidate {
    pub candidate_id: String,
    pub confidence: f32,
    pub hold_started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastConfirmation {
    pub candidate_id: String,
    pub confirmed_at: DateTime<Utc>,
    pub admitted: bool,
}

/// Read-only view of the engine for status readers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub tracked: Option<TrackedCandidate>,
    pub last_confirmation: Option<LastConfirmation>,
    pub samples_observed: u64,
}

enum Command {
    Observe(Sample),
    Revoke {
        candidate_id: String,
        at: DateTime<Utc>,
    },
    Shutdown,
}

/// Cheap, cloneable entry point for producers and readers.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<EngineSnapshot>,
    outcomes: broadcast::Sender<AttendanceOutcome>,
}

impl EngineHandle {
    /// Queues a sample. Samples are applied strictly in the order they are sent.
    pub async fn observe(&self, sample: Sample) -> Result<()> {
        self.commands
            .send(Command::Observe(sample))
            .await
            .map_err(|_| EngineError::Shutdown)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot.clone()
    }

    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<AttendanceOutcome> {
        self.outcomes.subscribe()
    }
}

/// Owns the track slot and the cooldown registry on a single task. Everything
/// else talks to it through [`EngineHandle`].
pub struct RecognitionEngine {
    handle: EngineHandle,
    engine_task: JoinHandle<()>,
    recorder_task: JoinHandle<()>,
}

impl RecognitionEngine {
    pub fn start(
        settings: EngineSettings,
        recorder: Arc<AttendanceRecorder>,
        broadcaster: Arc<EventBroadcaster>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(settings.sample_queue_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());
        let (outcome_tx, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        let (queue_tx, queue_rx) = mpsc::channel(settings.recorder_queue_capacity);

        let worker = RecorderWorker {
            recorder,
            broadcaster,
            outcomes: outcome_tx.clone(),
            metrics: metrics.clone(),
            // Weak, so a dropped engine still winds both tasks down.
            rollback: settings.rollback_on_write_failure.then(|| command_tx.downgrade()),
        };
        let recorder_task = tokio::spawn(worker.run(queue_rx));

        let state = EngineState {
            tracker: ConfirmationTracker::new(settings.tracker),
            cooldowns: CooldownRegistry::new(settings.global_cooldown, settings.candidate_cooldown),
            recorder_queue: queue_tx,
            snapshot: snapshot_tx,
            outcomes: outcome_tx.clone(),
            metrics,
            rollback_on_drop: settings.rollback_on_write_failure,
            samples_observed: 0,
            last_confirmation: None,
        };
        let engine_task = tokio::spawn(state.run(command_rx));

        info!("Recognition engine started");

        Self {
            handle: EngineHandle {
                commands: command_tx,
                snapshot: snapshot_rx,
                outcomes: outcome_tx,
            },
            engine_task,
            recorder_task,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Stops accepting samples, then lets the recorder finish what is queued.
    pub async fn shutdown(self) -> Result<()> {
        // Already stopped if this fails.
        let _ = self.handle.commands.send(Command::Shutdown).await;

        if let Err(e) = self.engine_task.await {
            error!("Engine task ended abnormally: {}", e);
        }
        if let Err(e) = self.recorder_task.await {
            error!("Recorder task ended abnormally: {}", e);
        }

        info!("Recognition engine stopped");
        Ok(())
    }
}

struct EngineState {
    tracker: ConfirmationTracker,
    cooldowns: CooldownRegistry,
    recorder_queue: mpsc::Sender<Confirmation>,
    snapshot: watch::Sender<EngineSnapshot>,
    outcomes: broadcast::Sender<AttendanceOutcome>,
    metrics: Arc<EngineMetrics>,
    rollback_on_drop: bool,
    samples_observed: u64,
    last_confirmation: Option<LastConfirmation>,
}

impl EngineState {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Observe(sample) => self.on_sample(sample),
                Command::Revoke { candidate_id, at } => {
                    debug!(candidate_id = %candidate_id, "Rolling back cooldown after failed write");
                    self.cooldowns.revoke(&candidate_id, at);
                }
                Command::Shutdown => break,
            }
        }
    }

    fn on_sample(&mut self, sample: Sample) {
        self.samples_observed += 1;
        self.metrics.record_sample();

        if let Decision::Confirmed(confirmation) = self.tracker.observe(sample) {
            self.on_confirmation(confirmation);
        }

        self.publish_snapshot();
    }

    fn on_confirmation(&mut self, confirmation: Confirmation) {
        let admitted = self
            .cooldowns
            .admit(&confirmation.candidate_id, confirmation.confirmed_at);
        self.metrics.record_confirmation(admitted);

        self.last_confirmation = Some(LastConfirmation {
            candidate_id: confirmation.candidate_id.clone(),
            confirmed_at: confirmation.confirmed_at,
            admitted,
        });

        if !admitted {
            debug!(candidate_id = %confirmation.candidate_id, "Confirmation throttled");
            return;
        }

        info!(
            candidate_id = %confirmation.candidate_id,
            confidence = confirmation.confidence,
            "Candidate confirmed"
        );

        // Never wait on the recorder from here; a slow store must not stall ingestion.
        if let Err(e) = self.recorder_queue.try_send(confirmation) {
            let confirmation = match e {
                TrySendError::Full(c) | TrySendError::Closed(c) => c,
            };
            warn!(candidate_id = %confirmation.candidate_id, "Recorder queue unavailable, dropping confirmation");
            self.metrics.record_dropped();
            if self.rollback_on_drop {
                self.cooldowns
                    .revoke(&confirmation.candidate_id, confirmation.confirmed_at);
            }
            let _ = self.outcomes.send(AttendanceOutcome::Dropped {
                candidate_id: confirmation.candidate_id,
                confirmed_at: confirmation.confirmed_at,
            });
        }
    }

    fn publish_snapshot(&self) {
        let tracked = self.tracker.state().map(|state| TrackedCandidate {
            candidate_id: state.candidate_id.clone(),
            confidence: state.confidence,
            hold_started_at: state.hold_started_at,
        });

        self.snapshot.send_replace(EngineSnapshot {
            tracked,
            last_confirmation: self.last_confirmation.clone(),
            samples_observed: self.samples_observed,
        });
    }
}

/// Applies admitted confirmations one at a time, so store writes are serialised
/// across all candidates.
struct RecorderWorker {
    recorder: Arc<AttendanceRecorder>,
    broadcaster: Arc<EventBroadcaster>,
    outcomes: broadcast::Sender<AttendanceOutcome>,
    metrics: Arc<EngineMetrics>,
    rollback: Option<mpsc::WeakSender<Command>>,
}

impl RecorderWorker {
    async fn run(self, mut queue: mpsc::Receiver<Confirmation>) {
        while let Some(confirmation) = queue.recv().await {
            let outcome = self.process(confirmation).await;
            // No listeners is fine.
            let _ = self.outcomes.send(outcome);
        }
    }

    async fn process(&self, confirmation: Confirmation) -> AttendanceOutcome {
        let Confirmation {
            candidate_id,
            confidence,
            confirmed_at,
            evidence,
        } = confirmation;

        match self
            .recorder
            .record(&candidate_id, evidence.clone(), confirmed_at)
            .await
        {
            Ok(RecordResult::Recorded(at)) => {
                self.metrics.record_recorded();
                self.broadcaster.publish(AttendancePayload::new(
                    candidate_id.clone(),
                    confidence,
                    at,
                    evidence,
                ));
                AttendanceOutcome::Recorded {
                    candidate_id,
                    confidence,
                    at,
                }
            }
            Ok(RecordResult::AlreadyAttended(previous_at)) => {
                self.metrics.record_already_attended();
                AttendanceOutcome::AlreadyAttended {
                    candidate_id,
                    previous_at,
                }
            }
            Err(e) => {
                self.metrics.record_store_failure();
                error!(candidate_id = %candidate_id, error = %e, "Attendance not recorded");

                if e.is_write_failure() {
                    if let Some(commands) = self.rollback.as_ref().and_then(|weak| weak.upgrade()) {
                        let _ = commands
                            .send(Command::Revoke {
                                candidate_id: candidate_id.clone(),
                                at: confirmed_at,
                            })
                            .await;
                    }
                }

                AttendanceOutcome::Failed {
                    candidate_id,
                    confirmed_at,
                    error: e.to_string(),
                }
            }
        }
    }
}
