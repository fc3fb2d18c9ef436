// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from error variants to recovery strategies.

use recall_core::RecallError;

/// How the coordinator reacts to a given error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Use the caller's fallback value; retry once only if none was given.
    SubstituteFallback,
    /// Retry once against an alternative resource, then fall back.
    RetryWithAlternative,
    /// Retry with delays of `base * 2^attempt` until `max_retries`.
    ExponentialBackoff,
    /// Surface the error unchanged.
    NonRecoverable,
}

/// Strategy assigned to an error variant.
pub fn strategy_for(error: &RecallError) -> RecoveryStrategy {
    match error {
        // reduced feature set, re-normalized vectors, partial similarity, defaults
        RecallError::MetadataExtraction { .. }
        | RecallError::DimensionMismatch { .. }
        | RecallError::MissingMetadata { .. }
        | RecallError::NumericalOverflow { .. }
        | RecallError::InvalidThreshold { .. } => RecoveryStrategy::SubstituteFallback,

        // alternate model or cached embedding, index rebuild, regenerated representation
        RecallError::EmbeddingGeneration { .. }
        | RecallError::IndexCorruption { .. }
        | RecallError::RepresentationGeneration { .. } => RecoveryStrategy::RetryWithAlternative,

        RecallError::ConcurrentAccess { .. } | RecallError::Internal(_) => {
            RecoveryStrategy::ExponentialBackoff
        }

        RecallError::CapacityExceeded { .. }
        | RecallError::MemoryNotFound { .. }
        | RecallError::Initialization(_)
        | RecallError::InvalidConfiguration { .. }
        | RecallError::UnsupportedStrategy { .. }
        | RecallError::InvalidInput { .. }
        | RecallError::InvalidDecayOutput { .. } => RecoveryStrategy::NonRecoverable,
    }
}
