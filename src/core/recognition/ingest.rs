// src/core/recognition/ingest.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

use super::oracle::SimilarityOracle;
use super::sample::Sample;
use crate::core::services::EngineHandle;
use crate::utils::{config::Config, error::Result};

#[derive(Debug, Clone)]
pub struct DetectedFace {
    /// Unit-length face embedding.
    pub embedding: Vec<f32>,
    /// Encoded crop of the face, used as check-in evidence.
    pub crop: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct FaceFrame {
    pub captured_at: DateTime<Utc>,
    pub faces: Vec<DetectedFace>,
}

/// Turns located faces into engine samples: one lookup per face, one sample per
/// processed frame carrying only the best match.
pub struct FrameIngestor<O: SimilarityOracle + ?Sized> {
    oracle: Arc<O>,
    engine: EngineHandle,
    match_threshold: f32,
    frame_stride: u64,
    frames_seen: u64,
}

impl<O: SimilarityOracle + ?Sized> FrameIngestor<O> {
    pub fn new(oracle: Arc<O>, engine: EngineHandle, match_threshold: f32, frame_stride: u32) -> Self {
        Self {
            oracle,
            engine,
            match_threshold,
            frame_stride: u64::from(frame_stride.max(1)),
            frames_seen: 0,
        }
    }

    pub fn from_config(oracle: Arc<O>, engine: EngineHandle, config: &Config) -> Self {
        Self::new(
            oracle,
            engine,
            config.engine.match_threshold as f32,
            config.engine.frame_stride,
        )
    }

    /// Returns the forwarded sample, or `None` when the frame was skipped.
    pub async fn process(&mut self, frame: FaceFrame) -> Result<Option<Sample>> {
        self.frames_seen += 1;
        if self.frames_seen % self.frame_stride != 0 {
            return Ok(None);
        }

        let sample = self.best_sample(frame).await;
        self.engine.observe(sample.clone()).await?;
        Ok(Some(sample))
    }

    async fn best_sample(&self, frame: FaceFrame) -> Sample {
        let mut best: Option<(String, f32, Option<Vec<u8>>)> = None;

        for face in frame.faces {
            let found = match self.oracle.best_match(&face.embedding).await {
                Ok(found) => found,
                Err(e) => {
                    // A failed lookup counts as no match for this face.
                    warn!(error = %e, "Similarity lookup failed");
                    continue;
                }
            };

            let candidate_id = match found.candidate_id {
                Some(id) if found.confidence > self.match_threshold => id,
                _ => continue,
            };

            let better = best
                .as_ref()
                .map_or(true, |(_, confidence, _)| found.confidence > *confidence);
            if better {
                best = Some((candidate_id, found.confidence, face.crop));
            }
        }

        match best {
            Some((candidate_id, confidence, crop)) => Sample {
                candidate_id: Some(candidate_id),
                confidence,
                observed_at: frame.captured_at,
                evidence: crop,
            },
            None => Sample::unknown(frame.captured_at),
        }
    }
}
