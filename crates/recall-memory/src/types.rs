// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types for the activation engine.

use chrono::{DateTime, Utc};
use recall_config::WeightProfile;
use recall_core::{ContextType, RecallError};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// An embedding vector together with the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
}

impl Embedding {
    pub fn new(vector: Vec<f32>, model: impl Into<String>) -> Self {
        let dimensions = vector.len();
        Self {
            vector,
            model: model.into(),
            dimensions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }
}

/// A named entity found in a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub confidence: f64,
}

/// Kind of a structural element within a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StructuralKind {
    Heading,
    ListItem,
    CodeBlock,
    Paragraph,
    Sentence,
}

impl StructuralKind {
    /// Single-letter code used in fingerprints.
    pub fn code(&self) -> char {
        match self {
            StructuralKind::Heading => 'H',
            StructuralKind::ListItem => 'L',
            StructuralKind::CodeBlock => 'C',
            StructuralKind::Paragraph => 'P',
            StructuralKind::Sentence => 'S',
        }
    }
}

/// A heading, list item, code block, paragraph or sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralElement {
    #[serde(rename = "type")]
    pub kind: StructuralKind,
    pub content: String,
    /// Zero-based order of the element within its text.
    pub position: usize,
}

/// Raw metadata attached to a memory or context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Lowercase topic words.
    pub topics: Vec<String>,
    /// Entities, unique by name.
    pub entities: Vec<Entity>,
    pub intent: String,
    pub temporal_markers: Vec<DateTime<Utc>>,
    pub structural_elements: Vec<StructuralElement>,
}

/// A transient query or storage context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub content: String,
    pub embedding: Embedding,
    pub metadata: MemoryMetadata,
    pub summary: String,
    pub context_type: ContextType,
}

/// Kind of a typed edge between two metadata items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Ordering or nesting between structural elements.
    Hierarchical,
    /// Co-occurrence of an entity and a topic.
    Association,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub source: String,
    pub target: String,
}

/// Deduplicated metadata produced by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetadata {
    pub topics: Vec<String>,
    pub entities: Vec<Entity>,
    pub concepts: Vec<String>,
    pub relationships: Vec<Relationship>,
    /// Always within [0, 1].
    pub importance: f64,
}

/// A stored memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    #[serde(skip)]
    pub embedding: Option<Embedding>,
    pub metadata: MemoryMetadata,
    pub normalized: NormalizedMetadata,
    pub summary: String,
    pub fingerprint: String,
    pub context_type: ContextType,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
}

/// The four similarity signals between a memory and a query context.
///
/// Values are conceptually in [0, 1] but are clamped by the scorer rather
/// than trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScores {
    pub embedding_similarity: f64,
    pub metadata_similarity: f64,
    pub summary_similarity: f64,
    pub temporal_relevance: f64,
}

/// Relative weights of the four similarity signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub embedding: f64,
    pub metadata: f64,
    pub summary: f64,
    pub temporal: f64,
}

impl ScoringWeights {
    pub const EQUAL: ScoringWeights = ScoringWeights {
        embedding: 0.25,
        metadata: 0.25,
        summary: 0.25,
        temporal: 0.25,
    };

    pub const fn new(embedding: f64, metadata: f64, summary: f64, temporal: f64) -> Self {
        Self {
            embedding,
            metadata,
            summary,
            temporal,
        }
    }

    fn as_array(&self) -> [f64; 4] {
        [self.embedding, self.metadata, self.summary, self.temporal]
    }

    /// Weights scaled to sum to 1.
    ///
    /// Falls back to equal weights when any weight is negative or non-finite,
    /// or when the sum is not positive.
    pub fn normalized(&self) -> ScoringWeights {
        let weights = self.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Self::EQUAL;
        }
        let sum: f64 = weights.iter().sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Self::EQUAL;
        }
        Self::new(
            self.embedding / sum,
            self.metadata / sum,
            self.summary / sum,
            self.temporal / sum,
        )
    }
}

impl From<WeightProfile> for ScoringWeights {
    fn from(profile: WeightProfile) -> Self {
        Self::new(
            profile.embedding,
            profile.metadata,
            profile.summary,
            profile.temporal,
        )
    }
}

/// Outcome of comparing an activation score with a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Retrieved,
    Skipped,
    Deferred,
}

/// A recorded retrieval decision for one memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalDecision {
    pub memory_id: String,
    pub activation_score: f64,
    pub threshold: f64,
    pub decision: Decision,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Which signal contributed most to a candidate's activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RelevanceType {
    Semantic,
    Topical,
    Contextual,
    Temporal,
}

/// A memory considered for surfacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub memory_id: String,
    pub activation_score: f64,
    pub relevance_type: RelevanceType,
    pub summary: String,
    /// Distance of the score from the threshold, scaled into [0, 1].
    pub confidence: f64,
    /// Whether the candidate was retrieved.
    pub selected: bool,
}

/// Store-wide statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_memories: usize,
    /// Mean of the scores from the most recent scoring pass, 0 when none.
    pub average_activation_score: f64,
    /// Approximate heap footprint of stored memories in bytes.
    pub memory_usage_estimate: usize,
    pub last_cleanup: Option<DateTime<Utc>>,
}

/// Cosine similarity between two vectors.
///
/// Returns 0 when either vector has zero norm. Mismatched lengths fail with
/// `DimensionMismatch`; a non-finite result fails with `NumericalOverflow`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, RecallError> {
    if a.len() != b.len() {
        return Err(RecallError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return Err(RecallError::NumericalOverflow {
            operation: "cosine_similarity".to_string(),
            value: similarity,
        });
    }
    Ok(similarity.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical() {
        let v = vec![0.5773_f32, 0.5773, 0.5773];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < f64::EPSILON);
    }

    #[test]
    fn cosine_similarity_opposite() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((sim + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn cosine_similarity_length_mismatch() {
        let err = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert_eq!(
            err,
            RecallError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn cosine_similarity_overflow() {
        let err = cosine_similarity(&[f32::INFINITY, 1.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, RecallError::NumericalOverflow { .. }));
    }

    #[test]
    fn weights_normalize_to_one() {
        let w = ScoringWeights::new(2.0, 1.0, 1.0, 0.0).normalized();
        assert_eq!(w, ScoringWeights::new(0.5, 0.25, 0.25, 0.0));
    }

    #[test]
    fn invalid_weights_fall_back_to_equal() {
        assert_eq!(
            ScoringWeights::new(0.0, 0.0, 0.0, 0.0).normalized(),
            ScoringWeights::EQUAL
        );
        assert_eq!(
            ScoringWeights::new(-1.0, 2.0, 0.0, 0.0).normalized(),
            ScoringWeights::EQUAL
        );
        assert_eq!(
            ScoringWeights::new(f64::NAN, 1.0, 1.0, 1.0).normalized(),
            ScoringWeights::EQUAL
        );
    }

    #[test]
    fn entity_type_serializes_as_type() {
        let entity = Entity {
            name: "Rust".into(),
            entity_type: "technology".into(),
            confidence: 0.7,
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "technology");
    }

    #[test]
    fn decision_parses_snake_case() {
        assert_eq!("deferred".parse::<Decision>().unwrap(), Decision::Deferred);
        assert_eq!(Decision::Retrieved.to_string(), "retrieved");
    }
}
