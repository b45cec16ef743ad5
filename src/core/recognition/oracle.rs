// src/core/recognition/oracle.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// Best known identity for one face embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMatch {
    pub candidate_id: Option<String>,
    /// Similarity in [0, 1].
    pub confidence: f32,
}

impl BestMatch {
    pub fn none() -> Self {
        Self {
            candidate_id: None,
            confidence: 0.0,
        }
    }
}

/// Vector search over enrolled faces. Implemented outside this crate.
#[async_trait]
pub trait SimilarityOracle: Send + Sync {
    async fn best_match(&self, embedding: &[f32]) -> Result<BestMatch>;
}
