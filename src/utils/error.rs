// src/utils/error.rs
use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read attendance for {candidate_id}: {source}")]
    AttendanceRead {
        candidate_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to write attendance for {candidate_id}: {source}")]
    AttendanceWrite {
        candidate_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Engine is shut down")]
    Shutdown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// True when the store write was attempted and did not land.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, EngineError::AttendanceWrite { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
