// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Recall memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use recall_core::ContextType;
use serde::{Deserialize, Serialize};

/// Top-level Recall configuration.
///
/// Every section is optional and defaults to the values the engine was tuned with.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecallConfig {
    /// Process-level settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Activation thresholds and the deferred band.
    #[serde(default)]
    pub activation: ActivationConfig,

    /// Per-context-type scoring weight overrides.
    #[serde(default)]
    pub weights: WeightsConfig,

    /// Retry and backoff settings for the Recovery Coordinator.
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Memory store limits and representation settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Activation thresholds per context type.
///
/// A memory whose activation score reaches the threshold for the query's
/// context type is retrieved. Scores within `deferred_margin` below the
/// threshold are deferred rather than skipped.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ActivationConfig {
    #[serde(default = "default_conversation_threshold")]
    pub conversation_threshold: f64,

    #[serde(default = "default_document_threshold")]
    pub document_threshold: f64,

    #[serde(default = "default_task_threshold")]
    pub task_threshold: f64,

    #[serde(default = "default_query_threshold")]
    pub query_threshold: f64,

    #[serde(default = "default_mixed_threshold")]
    pub mixed_threshold: f64,

    /// Width of the deferred band below each threshold.
    #[serde(default = "default_deferred_margin")]
    pub deferred_margin: f64,

    /// Half-life (hours) of the temporal relevance signal.
    #[serde(default = "default_temporal_half_life_hours")]
    pub temporal_half_life_hours: f64,
}

impl ActivationConfig {
    /// Threshold configured for the given context type.
    pub fn threshold_for(&self, context_type: ContextType) -> f64 {
        match context_type {
            ContextType::Conversation => self.conversation_threshold,
            ContextType::Document => self.document_threshold,
            ContextType::Task => self.task_threshold,
            ContextType::Query => self.query_threshold,
            ContextType::Mixed => self.mixed_threshold,
        }
    }

    /// Compiled-in threshold for the given context type.
    pub fn default_threshold_for(context_type: ContextType) -> f64 {
        ActivationConfig::default().threshold_for(context_type)
    }
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            conversation_threshold: default_conversation_threshold(),
            document_threshold: default_document_threshold(),
            task_threshold: default_task_threshold(),
            query_threshold: default_query_threshold(),
            mixed_threshold: default_mixed_threshold(),
            deferred_margin: default_deferred_margin(),
            temporal_half_life_hours: default_temporal_half_life_hours(),
        }
    }
}

fn default_conversation_threshold() -> f64 {
    0.3
}

fn default_document_threshold() -> f64 {
    0.25
}

fn default_task_threshold() -> f64 {
    0.3
}

fn default_query_threshold() -> f64 {
    0.25
}

fn default_mixed_threshold() -> f64 {
    0.28
}

fn default_deferred_margin() -> f64 {
    0.05
}

fn default_temporal_half_life_hours() -> f64 {
    168.0
}

/// Weight profile for the four similarity signals.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WeightProfile {
    pub embedding: f64,
    pub metadata: f64,
    pub summary: f64,
    pub temporal: f64,
}

/// Optional per-context-type weight overrides.
///
/// Context types without an override use the scorer's built-in profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WeightsConfig {
    #[serde(default)]
    pub conversation: Option<WeightProfile>,

    #[serde(default)]
    pub document: Option<WeightProfile>,

    #[serde(default)]
    pub task: Option<WeightProfile>,

    #[serde(default)]
    pub query: Option<WeightProfile>,

    #[serde(default)]
    pub mixed: Option<WeightProfile>,
}

impl WeightsConfig {
    /// Override configured for the given context type, if any.
    pub fn override_for(&self, context_type: ContextType) -> Option<WeightProfile> {
        match context_type {
            ContextType::Conversation => self.conversation,
            ContextType::Document => self.document,
            ContextType::Task => self.task,
            ContextType::Query => self.query,
            ContextType::Mixed => self.mixed,
        }
    }

    /// All configured overrides with their section names.
    pub fn configured(&self) -> Vec<(&'static str, WeightProfile)> {
        [
            ("conversation", self.conversation),
            ("document", self.document),
            ("task", self.task),
            ("query", self.query),
            ("mixed", self.mixed),
        ]
        .into_iter()
        .filter_map(|(name, profile)| profile.map(|p| (name, p)))
        .collect()
    }
}

/// Recovery Coordinator settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecoveryConfig {
    /// Maximum retry attempts per retry key before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds; attempt `n` waits `base * 2^n`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

/// Memory store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Maximum number of memories held at once.
    #[serde(default = "default_max_memories")]
    pub max_memories: usize,

    /// Expected embedding vector length.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Maximum length of generated summaries, in characters.
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// Ranking strategy used when a caller does not name one.
    #[serde(default = "default_ranking")]
    pub default_ranking: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_memories: default_max_memories(),
            embedding_dimensions: default_embedding_dimensions(),
            summary_max_chars: default_summary_max_chars(),
            default_ranking: default_ranking(),
        }
    }
}

fn default_max_memories() -> usize {
    10_000
}

fn default_embedding_dimensions() -> usize {
    384
}

fn default_summary_max_chars() -> usize {
    200
}

fn default_ranking() -> String {
    "activation_score".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_are_in_documented_band() {
        let activation = ActivationConfig::default();
        for ct in [
            ContextType::Conversation,
            ContextType::Document,
            ContextType::Task,
            ContextType::Query,
            ContextType::Mixed,
        ] {
            let t = activation.threshold_for(ct);
            assert!((0.25..=0.3).contains(&t), "{ct} threshold {t} out of band");
        }
    }

    #[test]
    fn weights_override_lookup() {
        let weights = WeightsConfig {
            document: Some(WeightProfile {
                embedding: 1.0,
                metadata: 1.0,
                summary: 0.0,
                temporal: 0.0,
            }),
            ..Default::default()
        };
        assert!(weights.override_for(ContextType::Document).is_some());
        assert!(weights.override_for(ContextType::Conversation).is_none());
        assert_eq!(weights.configured().len(), 1);
        assert_eq!(weights.configured()[0].0, "document");
    }

    #[test]
    fn recovery_defaults() {
        let recovery = RecoveryConfig::default();
        assert_eq!(recovery.max_retries, 3);
        assert_eq!(recovery.base_delay_ms, 1000);
    }
}
