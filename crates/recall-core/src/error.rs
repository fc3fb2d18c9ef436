// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the Recall memory engine.
//!
//! Every failure the engine can produce is a variant of [`RecallError`].
//! Variants carry the values needed to explain the failure, report whether
//! the Recovery Coordinator may attempt to recover from them, and expose a
//! flat context map for structured logging.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across all Recall crates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecallError {
    /// Metadata could not be derived from a context.
    #[error("metadata extraction failed: {reason}")]
    MetadataExtraction { reason: String },

    /// The embedding adapter failed to produce a vector.
    #[error("embedding generation failed with model `{model}`: {reason}")]
    EmbeddingGeneration { model: String, reason: String },

    /// The store holds as many memories as it is allowed to.
    #[error("memory capacity exceeded: {current} of {limit} slots in use")]
    CapacityExceeded { current: usize, limit: usize },

    /// The fingerprint index no longer agrees with the stored memories.
    #[error("fingerprint index corrupted: {reason}")]
    IndexCorruption { reason: String },

    /// Embedding, metadata, or fingerprint for a memory could not be built.
    #[error("representation generation failed for memory {memory_id}: {reason}")]
    RepresentationGeneration { memory_id: String, reason: String },

    /// Two embedding vectors of different lengths were compared.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Metadata needed for a similarity signal is absent.
    #[error("missing metadata fields: {}", fields.join(", "))]
    MissingMetadata { fields: Vec<String> },

    /// A numeric computation produced a non-finite value.
    #[error("numerical overflow in {operation}: got {value}")]
    NumericalOverflow { operation: String, value: f64 },

    /// No memory exists with the requested id.
    #[error("memory not found: {memory_id}")]
    MemoryNotFound { memory_id: String },

    /// A configured activation threshold is outside [0, 1] or non-finite.
    #[error(
        "invalid activation threshold {threshold} for context type `{context_type}`: expected a finite value in [0, 1]"
    )]
    InvalidThreshold { context_type: String, threshold: f64 },

    /// Another writer currently holds the memory.
    #[error("concurrent access conflict on memory {memory_id} during {operation}")]
    ConcurrentAccess { memory_id: String, operation: String },

    /// A component could not be constructed.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// A configuration value is unusable.
    #[error("invalid configuration for `{key}`: {reason}")]
    InvalidConfiguration { key: String, reason: String },

    /// A ranking strategy name did not match any known strategy.
    #[error(
        "unsupported ranking strategy `{strategy}` (expected one of: activation_score, recency, access_frequency, combined, relevance_boost)"
    )]
    UnsupportedStrategy { strategy: String },

    /// A scorer argument was out of range.
    #[error("invalid input: {field} = {value} ({reason})")]
    InvalidInput {
        field: String,
        value: f64,
        reason: String,
    },

    /// A decay function returned a multiplier outside [0, 1].
    #[error("decay function returned {value}, expected a finite multiplier in [0, 1]")]
    InvalidDecayOutput { value: f64 },

    /// Internal or unclassified errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// The subsystem an error originated from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ContextProcessing,
    MemoryStorage,
    SimilarityComputation,
    MemoryRetrieval,
    Scoring,
    System,
}

impl RecallError {
    /// Returns the subsystem this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RecallError::MetadataExtraction { .. } | RecallError::EmbeddingGeneration { .. } => {
                ErrorCategory::ContextProcessing
            }
            RecallError::CapacityExceeded { .. }
            | RecallError::IndexCorruption { .. }
            | RecallError::RepresentationGeneration { .. } => ErrorCategory::MemoryStorage,
            RecallError::DimensionMismatch { .. }
            | RecallError::MissingMetadata { .. }
            | RecallError::NumericalOverflow { .. } => ErrorCategory::SimilarityComputation,
            RecallError::MemoryNotFound { .. }
            | RecallError::InvalidThreshold { .. }
            | RecallError::ConcurrentAccess { .. } => ErrorCategory::MemoryRetrieval,
            RecallError::UnsupportedStrategy { .. }
            | RecallError::InvalidInput { .. }
            | RecallError::InvalidDecayOutput { .. } => ErrorCategory::Scoring,
            RecallError::Initialization(_)
            | RecallError::InvalidConfiguration { .. }
            | RecallError::Internal(_) => ErrorCategory::System,
        }
    }

    /// Whether the Recovery Coordinator may attempt to recover from this error.
    ///
    /// Unclassified `Internal` errors are treated as transient.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RecallError::MetadataExtraction { .. }
            | RecallError::EmbeddingGeneration { .. }
            | RecallError::IndexCorruption { .. }
            | RecallError::RepresentationGeneration { .. }
            | RecallError::DimensionMismatch { .. }
            | RecallError::MissingMetadata { .. }
            | RecallError::NumericalOverflow { .. }
            | RecallError::InvalidThreshold { .. }
            | RecallError::ConcurrentAccess { .. }
            | RecallError::Internal(_) => true,
            RecallError::CapacityExceeded { .. }
            | RecallError::MemoryNotFound { .. }
            | RecallError::Initialization(_)
            | RecallError::InvalidConfiguration { .. }
            | RecallError::UnsupportedStrategy { .. }
            | RecallError::InvalidInput { .. }
            | RecallError::InvalidDecayOutput { .. } => false,
        }
    }

    /// Short machine-readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            RecallError::MetadataExtraction { .. } => "metadata_extraction",
            RecallError::EmbeddingGeneration { .. } => "embedding_generation",
            RecallError::CapacityExceeded { .. } => "capacity_exceeded",
            RecallError::IndexCorruption { .. } => "index_corruption",
            RecallError::RepresentationGeneration { .. } => "representation_generation",
            RecallError::DimensionMismatch { .. } => "dimension_mismatch",
            RecallError::MissingMetadata { .. } => "missing_metadata",
            RecallError::NumericalOverflow { .. } => "numerical_overflow",
            RecallError::MemoryNotFound { .. } => "memory_not_found",
            RecallError::InvalidThreshold { .. } => "invalid_threshold",
            RecallError::ConcurrentAccess { .. } => "concurrent_access",
            RecallError::Initialization(_) => "initialization",
            RecallError::InvalidConfiguration { .. } => "invalid_configuration",
            RecallError::UnsupportedStrategy { .. } => "unsupported_strategy",
            RecallError::InvalidInput { .. } => "invalid_input",
            RecallError::InvalidDecayOutput { .. } => "invalid_decay_output",
            RecallError::Internal(_) => "internal",
        }
    }

    /// Flat key/value view of the error payload for structured logs and reports.
    pub fn context(&self) -> BTreeMap<&'static str, String> {
        let mut ctx = BTreeMap::new();
        ctx.insert("code", self.code().to_string());
        ctx.insert("category", self.category().to_string());
        ctx.insert("recoverable", self.is_recoverable().to_string());

        match self {
            RecallError::MetadataExtraction { reason }
            | RecallError::IndexCorruption { reason } => {
                ctx.insert("reason", reason.clone());
            }
            RecallError::EmbeddingGeneration { model, reason } => {
                ctx.insert("model", model.clone());
                ctx.insert("reason", reason.clone());
            }
            RecallError::CapacityExceeded { current, limit } => {
                ctx.insert("current", current.to_string());
                ctx.insert("limit", limit.to_string());
            }
            RecallError::RepresentationGeneration { memory_id, reason } => {
                ctx.insert("memory_id", memory_id.clone());
                ctx.insert("reason", reason.clone());
            }
            RecallError::DimensionMismatch { expected, actual } => {
                ctx.insert("expected", expected.to_string());
                ctx.insert("actual", actual.to_string());
            }
            RecallError::MissingMetadata { fields } => {
                ctx.insert("fields", fields.join(","));
            }
            RecallError::NumericalOverflow { operation, value } => {
                ctx.insert("operation", operation.clone());
                ctx.insert("value", value.to_string());
            }
            RecallError::MemoryNotFound { memory_id } => {
                ctx.insert("memory_id", memory_id.clone());
            }
            RecallError::InvalidThreshold {
                context_type,
                threshold,
            } => {
                ctx.insert("context_type", context_type.clone());
                ctx.insert("threshold", threshold.to_string());
            }
            RecallError::ConcurrentAccess {
                memory_id,
                operation,
            } => {
                ctx.insert("memory_id", memory_id.clone());
                ctx.insert("operation", operation.clone());
            }
            RecallError::Initialization(message) | RecallError::Internal(message) => {
                ctx.insert("message", message.clone());
            }
            RecallError::InvalidConfiguration { key, reason } => {
                ctx.insert("key", key.clone());
                ctx.insert("reason", reason.clone());
            }
            RecallError::UnsupportedStrategy { strategy } => {
                ctx.insert("strategy", strategy.clone());
            }
            RecallError::InvalidInput {
                field,
                value,
                reason,
            } => {
                ctx.insert("field", field.clone());
                ctx.insert("value", value.to_string());
                ctx.insert("reason", reason.clone());
            }
            RecallError::InvalidDecayOutput { value } => {
                ctx.insert("value", value.to_string());
            }
        }

        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_and_not_found_are_not_recoverable() {
        let capacity = RecallError::CapacityExceeded {
            current: 10,
            limit: 10,
        };
        let missing = RecallError::MemoryNotFound {
            memory_id: "m1".into(),
        };
        assert!(!capacity.is_recoverable());
        assert!(!missing.is_recoverable());
        assert_eq!(capacity.category(), ErrorCategory::MemoryStorage);
        assert_eq!(missing.category(), ErrorCategory::MemoryRetrieval);
    }

    #[test]
    fn similarity_errors_are_recoverable() {
        let mismatch = RecallError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert!(mismatch.is_recoverable());
        assert_eq!(mismatch.category(), ErrorCategory::SimilarityComputation);
        assert_eq!(
            mismatch.to_string(),
            "embedding dimension mismatch: expected 384, got 768"
        );
    }

    #[test]
    fn unsupported_strategy_names_the_value() {
        let err = RecallError::UnsupportedStrategy {
            strategy: "alphabetical".into(),
        };
        assert!(err.to_string().contains("alphabetical"));
        assert_eq!(err.context().get("strategy").map(String::as_str), Some("alphabetical"));
    }

    #[test]
    fn invalid_input_reports_out_of_range_value() {
        let err = RecallError::InvalidInput {
            field: "base_score".into(),
            value: -0.1,
            reason: "must be within [0, 1]".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("base_score"));
        assert!(msg.contains("-0.1"));
    }

    #[test]
    fn context_map_carries_code_and_category() {
        let err = RecallError::ConcurrentAccess {
            memory_id: "m7".into(),
            operation: "retrieve_memory".into(),
        };
        let ctx = err.context();
        assert_eq!(ctx["code"], "concurrent_access");
        assert_eq!(ctx["category"], "memory_retrieval");
        assert_eq!(ctx["recoverable"], "true");
        assert_eq!(ctx["memory_id"], "m7");
    }

    #[test]
    fn internal_errors_are_treated_as_transient() {
        let err = RecallError::Internal("boom".into());
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::System);
    }
}
