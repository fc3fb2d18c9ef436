// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks numeric ranges that serde cannot express. All problems are
//! collected before returning so a user can fix them in one pass.

use recall_core::ContextType;
use strum::IntoEnumIterator;

use crate::diagnostic::ConfigError;
use crate::model::{RecallConfig, WeightProfile};

/// Accepted `engine.log_level` values.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Accepted `store.default_ranking` values.
pub const RANKING_STRATEGIES: &[&str] = &[
    "activation_score",
    "recency",
    "access_frequency",
    "combined",
    "relevance_boost",
];

/// Upper bound on `recovery.max_retries`; larger values make backoff delays absurd.
const MAX_RETRIES_LIMIT: u32 = 10;

/// A configuration value outside its accepted range.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Dotted key, e.g. `activation.deferred_margin`.
    pub key: String,
    pub message: String,
}

impl Violation {
    fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<Violation> for ConfigError {
    fn from(v: Violation) -> Self {
        ConfigError::Validation {
            message: format!("{} {}", v.key, v.message),
        }
    }
}

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &RecallConfig) -> Result<(), Vec<ConfigError>> {
    let mut violations = Vec::new();

    if !LOG_LEVELS.contains(&config.engine.log_level.as_str()) {
        violations.push(Violation::new(
            "engine.log_level",
            format!(
                "`{}` is not one of: {}",
                config.engine.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    for context_type in ContextType::iter() {
        let threshold = config.activation.threshold_for(context_type);
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            violations.push(Violation::new(
                format!("activation.{context_type}_threshold"),
                format!("must be within [0, 1], got {threshold}"),
            ));
        }
    }

    violations.extend(runtime_violations(config));

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations.into_iter().map(ConfigError::from).collect())
    }
}

/// Values the engine cannot run with.
///
/// Activation thresholds are excluded: an unusable threshold falls back to
/// its built-in default at query time.
pub fn runtime_violations(config: &RecallConfig) -> Vec<Violation> {
    let mut violations = Vec::new();

    let margin = config.activation.deferred_margin;
    if !margin.is_finite() || !(0.0..=0.5).contains(&margin) {
        violations.push(Violation::new(
            "activation.deferred_margin",
            format!("must be within [0, 0.5], got {margin}"),
        ));
    }

    let half_life = config.activation.temporal_half_life_hours;
    if !half_life.is_finite() || half_life <= 0.0 {
        violations.push(Violation::new(
            "activation.temporal_half_life_hours",
            format!("must be positive, got {half_life}"),
        ));
    }

    for (name, profile) in config.weights.configured() {
        if let Some(message) = check_weight_profile(&profile) {
            violations.push(Violation::new(format!("weights.{name}"), message));
        }
    }

    if config.recovery.max_retries > MAX_RETRIES_LIMIT {
        violations.push(Violation::new(
            "recovery.max_retries",
            format!(
                "must be at most {MAX_RETRIES_LIMIT}, got {}",
                config.recovery.max_retries
            ),
        ));
    }

    if config.store.max_memories == 0 {
        violations.push(Violation::new("store.max_memories", "must be at least 1"));
    }

    if config.store.embedding_dimensions == 0 {
        violations.push(Violation::new(
            "store.embedding_dimensions",
            "must be at least 1",
        ));
    }

    if config.store.summary_max_chars < 16 {
        violations.push(Violation::new(
            "store.summary_max_chars",
            format!("must be at least 16, got {}", config.store.summary_max_chars),
        ));
    }

    if !RANKING_STRATEGIES.contains(&config.store.default_ranking.as_str()) {
        violations.push(Violation::new(
            "store.default_ranking",
            format!(
                "`{}` is not one of: {}",
                config.store.default_ranking,
                RANKING_STRATEGIES.join(", ")
            ),
        ));
    }

    violations
}

fn check_weight_profile(profile: &WeightProfile) -> Option<String> {
    let values = [
        ("embedding", profile.embedding),
        ("metadata", profile.metadata),
        ("summary", profile.summary),
        ("temporal", profile.temporal),
    ];
    if let Some((field, value)) = values
        .iter()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
    {
        return Some(format!("{field} must be a non-negative number, got {value}"));
    }
    let sum: f64 = values.iter().map(|(_, v)| v).sum();
    if sum <= 0.0 {
        return Some("at least one weight must be positive".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RecallConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = RecallConfig::default();
        config.activation.document_threshold = 1.5;
        config.activation.deferred_margin = -0.1;
        config.store.max_memories = 0;
        let errors = validate_config(&config).expect_err("should fail");
        assert_eq!(errors.len(), 3);
        assert!(errors[0].to_string().contains("document_threshold"));
        assert!(errors[0].to_string().contains("1.5"));
    }

    #[test]
    fn rejects_all_zero_weights() {
        let mut config = RecallConfig::default();
        config.weights.task = Some(WeightProfile {
            embedding: 0.0,
            metadata: 0.0,
            summary: 0.0,
            temporal: 0.0,
        });
        let errors = validate_config(&config).expect_err("zero weights");
        assert!(errors[0].to_string().contains("weights.task"));
    }

    #[test]
    fn rejects_unknown_ranking() {
        let mut config = RecallConfig::default();
        config.store.default_ranking = "alphabetical".into();
        let errors = validate_config(&config).expect_err("unknown ranking");
        assert!(errors[0].to_string().contains("alphabetical"));
    }

    #[test]
    fn parsed_half_life_must_be_positive() {
        let config: RecallConfig =
            toml::from_str("[activation]\ntemporal_half_life_hours = 0.0\n").unwrap();
        let errors = validate_config(&config).expect_err("zero half-life");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("temporal_half_life_hours"));
    }

    #[test]
    fn runtime_checks_skip_thresholds() {
        let mut config = RecallConfig::default();
        config.activation.query_threshold = 7.0;
        assert!(runtime_violations(&config).is_empty());

        config.activation.temporal_half_life_hours = -5.0;
        let violations = runtime_violations(&config);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].key, "activation.temporal_half_life_hours");
        assert!(violations[0].message.contains("-5"));
    }
}
