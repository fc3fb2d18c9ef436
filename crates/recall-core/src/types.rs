// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the Recall crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The kind of interaction a context belongs to.
///
/// Selects the scoring weight profile and activation threshold.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    Conversation,
    Document,
    Task,
    Query,
    #[default]
    Mixed,
}

impl ContextType {
    /// Parse a context type name, falling back to `Mixed` for unknown names.
    pub fn parse_lossy(name: &str) -> Self {
        name.trim().parse().unwrap_or(ContextType::Mixed)
    }

    /// Short code used inside fingerprints.
    pub fn code(&self) -> &'static str {
        match self {
            ContextType::Conversation => "CONV",
            ContextType::Document => "DOC",
            ContextType::Task => "TASK",
            ContextType::Query => "QRY",
            ContextType::Mixed => "MIX",
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    /// Texts to embed, one vector is produced per text.
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Name of the model that produced the vectors.
    pub model: String,
    /// Length of every vector in `embeddings`.
    pub dimensions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn context_type_parses_case_insensitively() {
        assert_eq!("Conversation".parse::<ContextType>().ok(), Some(ContextType::Conversation));
        assert_eq!("DOCUMENT".parse::<ContextType>().ok(), Some(ContextType::Document));
        assert_eq!(ContextType::parse_lossy("task"), ContextType::Task);
    }

    #[test]
    fn unknown_context_type_falls_back_to_mixed() {
        assert_eq!(ContextType::parse_lossy("poetry"), ContextType::Mixed);
        assert_eq!(ContextType::parse_lossy(""), ContextType::Mixed);
    }

    #[test]
    fn context_type_display_roundtrip() {
        for variant in ContextType::iter() {
            let parsed: ContextType = variant.to_string().parse().expect("should parse back");
            assert_eq!(parsed, variant);
        }
    }

    #[test]
    fn context_type_serializes_lowercase() {
        let json = serde_json::to_string(&ContextType::Query).expect("should serialize");
        assert_eq!(json, "\"query\"");
    }
}
