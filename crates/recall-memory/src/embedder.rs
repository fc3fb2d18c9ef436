// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local feature-hashing embedding adapter.
//!
//! Each lowercased content word and each adjacent word pair is hashed with
//! SHA-256 into a signed bucket of a fixed-size vector, which is then
//! L2-normalized. Deterministic and dependency-free at runtime, so texts
//! sharing vocabulary land close together under cosine similarity.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use recall_core::traits::{EmbeddingAdapter, PluginAdapter};
use recall_core::types::{EmbeddingInput, EmbeddingOutput, HealthStatus};
use recall_core::RecallError;

use crate::text::content_words;

/// Model name reported in every output.
pub const HASHING_MODEL: &str = "feature-hash-sha256";

/// Weight of a word pair relative to a single word.
const BIGRAM_WEIGHT: f32 = 0.5;

/// Feature-hashing embedder producing vectors of a fixed length.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self, RecallError> {
        if dimensions == 0 {
            return Err(RecallError::Initialization(
                "hashing embedder needs at least one dimension".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut index = [0u8; 8];
        index.copy_from_slice(&digest[..8]);
        let slot = (u64::from_le_bytes(index) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (slot, sign)
    }

    /// Embed a single text.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let words = content_words(text);
        let mut vector = vec![0.0_f32; self.dimensions];
        for word in &words {
            let (slot, sign) = self.bucket(word);
            vector[slot] += sign;
        }
        for pair in words.windows(2) {
            let (slot, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            vector[slot] += sign * BIGRAM_WEIGHT;
        }
        l2_normalize(&vector)
    }
}

/// Scale `vec` to unit length; vectors with (near) zero norm are returned as-is.
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter().map(|v| v / norm).collect()
    } else {
        vec.to_vec()
    }
}

#[async_trait]
impl PluginAdapter for HashingEmbedder {
    fn name(&self) -> &str {
        HASHING_MODEL
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for HashingEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, RecallError> {
        let embeddings: Vec<Vec<f32>> = input.texts.iter().map(|t| self.embed_text(t)).collect();
        debug!(
            texts = embeddings.len(),
            dimensions = self.dimensions,
            "hashed embeddings"
        );
        Ok(EmbeddingOutput {
            embeddings,
            model: HASHING_MODEL.to_string(),
            dimensions: self.dimensions,
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cosine_similarity;

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(
            HashingEmbedder::new(0),
            Err(RecallError::Initialization(_))
        ));
    }

    #[test]
    fn vectors_are_unit_length_and_deterministic() {
        let embedder = HashingEmbedder::new(64).unwrap();
        let a = embedder.embed_text("vector search with embeddings");
        let b = embedder.embed_text("vector search with embeddings");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_is_closer() {
        let embedder = HashingEmbedder::new(384).unwrap();
        let query = embedder.embed_text("TypeScript AI memory systems and embeddings");
        let related = embedder.embed_text("TypeScript AI memory systems with embeddings");
        let unrelated = embedder.embed_text("sourdough bread baking with a starter");
        let close = cosine_similarity(&query, &related).unwrap();
        let far = cosine_similarity(&query, &unrelated).unwrap();
        assert!(close > 0.9, "close = {close}");
        assert!(close > far);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8).unwrap();
        assert!(embedder.embed_text("").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn l2_normalize_unit_vector() {
        assert_eq!(l2_normalize(&[3.0, 4.0]), vec![0.6, 0.8]);
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn embed_reports_model_and_dimensions() {
        let embedder = HashingEmbedder::new(16).unwrap();
        let output = embedder
            .embed(EmbeddingInput {
                texts: vec!["one".into(), "two".into()],
            })
            .await
            .unwrap();
        assert_eq!(output.embeddings.len(), 2);
        assert_eq!(output.dimensions, 16);
        assert_eq!(output.model, HASHING_MODEL);
        assert_eq!(embedder.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
