pub mod engine;

pub use engine::{
    AttendanceOutcome, EngineHandle, EngineSettings, EngineSnapshot, LastConfirmation,
    RecognitionEngine, TrackedCandidate,
};
