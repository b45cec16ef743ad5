pub mod cooldown;
pub mod ingest;
pub mod oracle;
pub mod sample;
pub mod tracker;

pub use cooldown::CooldownRegistry;
pub use ingest::{DetectedFace, FaceFrame, FrameIngestor};
pub use oracle::{BestMatch, SimilarityOracle};
pub use sample::Sample;
pub use tracker::{Confirmation, ConfirmationTracker, Decision, TrackerSettings, TrackerState};
