// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Activation scoring, ranking strategies and temporal decay.
//!
//! Everything here is a pure function. Scores handed in are never trusted:
//! inputs are clamped to [0, 1] with non-finite values treated as 0, and
//! rankings drop any non-finite score.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use recall_core::{ContextType, RecallError};
use serde::{Deserialize, Serialize};

use crate::types::{ScoringWeights, SimilarityScores};

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Convex combination of the four clamped similarity signals.
pub fn compute_activation_score(scores: &SimilarityScores, weights: &ScoringWeights) -> f64 {
    let w = weights.normalized();
    let score = clamp_unit(scores.embedding_similarity) * w.embedding
        + clamp_unit(scores.metadata_similarity) * w.metadata
        + clamp_unit(scores.summary_similarity) * w.summary
        + clamp_unit(scores.temporal_relevance) * w.temporal;
    clamp_unit(score)
}

fn by_score_then_id(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(b.0))
}

/// Ids ordered by score descending; non-finite scores are dropped and ties
/// go to the lexicographically smaller id.
pub fn rank_memories_by_activation(scores: &HashMap<String, f64>) -> Vec<String> {
    let mut finite: Vec<(&str, f64)> = scores
        .iter()
        .filter(|(_, score)| score.is_finite())
        .map(|(id, score)| (id.as_str(), *score))
        .collect();
    finite.sort_by(|a, b| by_score_then_id(*a, *b));
    finite.into_iter().map(|(id, _)| id.to_string()).collect()
}

/// How to order memories for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    #[default]
    ActivationScore,
    Recency,
    AccessFrequency,
    Combined,
    RelevanceBoost,
}

impl RankingStrategy {
    pub const ALL: [RankingStrategy; 5] = [
        RankingStrategy::ActivationScore,
        RankingStrategy::Recency,
        RankingStrategy::AccessFrequency,
        RankingStrategy::Combined,
        RankingStrategy::RelevanceBoost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RankingStrategy::ActivationScore => "activation_score",
            RankingStrategy::Recency => "recency",
            RankingStrategy::AccessFrequency => "access_frequency",
            RankingStrategy::Combined => "combined",
            RankingStrategy::RelevanceBoost => "relevance_boost",
        }
    }
}

impl fmt::Display for RankingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingStrategy {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| RecallError::UnsupportedStrategy {
                strategy: s.to_string(),
            })
    }
}

/// The fields a ranking strategy looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct RankableMemory {
    pub id: String,
    pub activation_score: f64,
    /// Last access time; `recency` orders newest first.
    pub timestamp: DateTime<Utc>,
    pub access_count: u64,
}

/// Min-max normalization; a constant input maps to all ones.
fn min_max(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    values
        .iter()
        .map(|v| if span > 0.0 { (v - min) / span } else { 1.0 })
        .collect()
}

/// Order memories by `strategy`, returning their ids.
///
/// Memories with a non-finite activation score are excluded.
pub fn rank_memories_with_strategy(
    memories: &[RankableMemory],
    strategy: &str,
) -> Result<Vec<String>, RecallError> {
    let strategy: RankingStrategy = strategy.parse()?;
    Ok(rank_with(memories, strategy))
}

/// Typed form of [`rank_memories_with_strategy`].
pub fn rank_with(memories: &[RankableMemory], strategy: RankingStrategy) -> Vec<String> {
    let finite: Vec<&RankableMemory> = memories
        .iter()
        .filter(|m| m.activation_score.is_finite())
        .collect();

    let recency: Vec<f64> = finite
        .iter()
        .map(|m| m.timestamp.timestamp_millis() as f64)
        .collect();
    let frequency: Vec<f64> = finite.iter().map(|m| m.access_count as f64).collect();
    let recency_norm = min_max(&recency);
    let frequency_norm = min_max(&frequency);

    let mut keyed: Vec<(&str, f64)> = finite
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let activation = clamp_unit(m.activation_score);
            let key = match strategy {
                RankingStrategy::ActivationScore => activation,
                RankingStrategy::Recency => recency[i],
                RankingStrategy::AccessFrequency => frequency[i],
                RankingStrategy::Combined => {
                    0.6 * activation + 0.25 * recency_norm[i] + 0.15 * frequency_norm[i]
                }
                RankingStrategy::RelevanceBoost => {
                    activation * (1.0 + 0.2 * frequency_norm[i] + 0.1 * recency_norm[i])
                }
            };
            (m.id.as_str(), key)
        })
        .collect();

    keyed.sort_by(|a, b| by_score_then_id(*a, *b));
    keyed.into_iter().map(|(id, _)| id.to_string()).collect()
}

/// Multiply `base` by `decay(age)` after validating both sides.
///
/// `base` must be a finite value in [0, 1] and `age` finite and non-negative
/// (`InvalidInput`); the multiplier must be a finite value in [0, 1]
/// (`InvalidDecayOutput`).
pub fn apply_temporal_decay(
    base: f64,
    age: f64,
    decay: impl Fn(f64) -> f64,
) -> Result<f64, RecallError> {
    if !base.is_finite() || !(0.0..=1.0).contains(&base) {
        return Err(RecallError::InvalidInput {
            field: "base_score".to_string(),
            value: base,
            reason: "must be a finite value in [0, 1]".to_string(),
        });
    }
    if !age.is_finite() || age < 0.0 {
        return Err(RecallError::InvalidInput {
            field: "age".to_string(),
            value: age,
            reason: "must be a finite, non-negative value".to_string(),
        });
    }
    let multiplier = decay(age);
    if !multiplier.is_finite() || !(0.0..=1.0).contains(&multiplier) {
        return Err(RecallError::InvalidDecayOutput { value: multiplier });
    }
    Ok(base * multiplier)
}

/// Built-in decay families.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecayFunction {
    /// `exp(-rate · age)`.
    Exponential { rate: f64 },
    /// `max(0, 1 - age / horizon)`.
    Linear { horizon: f64 },
    /// `1 / (1 + ln(1 + rate · age))`.
    Logarithmic { rate: f64 },
    /// `1` before `cutoff`, `floor` from then on.
    Step { cutoff: f64, floor: f64 },
    None,
}

impl DecayFunction {
    /// Exponential decay halving every `half_life` units of age.
    pub fn half_life(half_life: f64) -> Self {
        DecayFunction::Exponential {
            rate: std::f64::consts::LN_2 / half_life,
        }
    }

    pub fn multiplier(&self, age: f64) -> f64 {
        match *self {
            DecayFunction::Exponential { rate } => (-rate * age).exp(),
            DecayFunction::Linear { horizon } => {
                if horizon <= 0.0 {
                    0.0
                } else {
                    (1.0 - age / horizon).max(0.0)
                }
            }
            DecayFunction::Logarithmic { rate } => 1.0 / (1.0 + (1.0 + rate * age).ln()),
            DecayFunction::Step { cutoff, floor } => {
                if age < cutoff {
                    1.0
                } else {
                    floor
                }
            }
            DecayFunction::None => 1.0,
        }
    }

    /// Apply this decay to `base` at `age`.
    pub fn apply(&self, base: f64, age: f64) -> Result<f64, RecallError> {
        apply_temporal_decay(base, age, |a| self.multiplier(a))
    }
}

/// Built-in weight profile for a context type name, case-insensitive.
///
/// Unknown names get the `mixed` profile.
pub fn default_weights(context_type: &str) -> ScoringWeights {
    weights_for(ContextType::parse_lossy(context_type))
}

/// Built-in weight profile for a context type.
pub fn weights_for(context_type: ContextType) -> ScoringWeights {
    match context_type {
        ContextType::Conversation => ScoringWeights::new(0.4, 0.3, 0.2, 0.1),
        ContextType::Document => ScoringWeights::new(0.3, 0.4, 0.2, 0.1),
        ContextType::Task => ScoringWeights::new(0.35, 0.3, 0.15, 0.2),
        ContextType::Query => ScoringWeights::new(0.45, 0.25, 0.2, 0.1),
        ContextType::Mixed => ScoringWeights::new(0.35, 0.35, 0.2, 0.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn scores(e: f64, m: f64, s: f64, t: f64) -> SimilarityScores {
        SimilarityScores {
            embedding_similarity: e,
            metadata_similarity: m,
            summary_similarity: s,
            temporal_relevance: t,
        }
    }

    fn rankable(id: &str, score: f64, hours_ago: i64, access_count: u64) -> RankableMemory {
        RankableMemory {
            id: id.to_string(),
            activation_score: score,
            timestamp: DateTime::<Utc>::UNIX_EPOCH + Duration::days(1000) - Duration::hours(hours_ago),
            access_count,
        }
    }

    #[test]
    fn clamps_out_of_range_signals() {
        let score = compute_activation_score(&scores(1.5, -0.2, f64::NAN, 0.5), &ScoringWeights::EQUAL);
        assert!((score - 0.375).abs() < 1e-12);
    }

    #[test]
    fn weight_scale_invariance() {
        let s = scores(0.9, 0.4, 0.2, 0.7);
        let a = compute_activation_score(&s, &ScoringWeights::new(2.0, 2.0, 2.0, 2.0));
        let b = compute_activation_score(&s, &ScoringWeights::EQUAL);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn zero_weights_fall_back_to_equal() {
        let s = scores(1.0, 0.0, 0.0, 0.0);
        let score = compute_activation_score(&s, &ScoringWeights::new(0.0, 0.0, 0.0, 0.0));
        assert!((score - 0.25).abs() < 1e-12);
    }

    #[test]
    fn rank_by_activation_descending() {
        let map: HashMap<String, f64> = [("m1", 0.8), ("m2", 0.9), ("m3", 0.7), ("m4", 0.95)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(rank_memories_by_activation(&map), vec!["m4", "m2", "m1", "m3"]);
    }

    #[test]
    fn rank_by_activation_drops_non_finite() {
        let map: HashMap<String, f64> = [
            ("m1", 0.8),
            ("m2", f64::NAN),
            ("m3", f64::INFINITY),
            ("m4", 0.7),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        assert_eq!(rank_memories_by_activation(&map), vec!["m1", "m4"]);
    }

    #[test]
    fn ties_break_by_id() {
        let map: HashMap<String, f64> = [("b", 0.5), ("a", 0.5), ("c", 0.5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(rank_memories_by_activation(&map), vec!["a", "b", "c"]);
    }

    #[test]
    fn unsupported_strategy_names_the_strategy() {
        let err = rank_memories_with_strategy(&[], "alphabetical").unwrap_err();
        assert_eq!(
            err,
            RecallError::UnsupportedStrategy {
                strategy: "alphabetical".into()
            }
        );
        assert!(err.to_string().contains("alphabetical"));
    }

    #[test]
    fn strategies_order_by_their_key() {
        let memories = vec![
            rankable("old-popular", 0.5, 48, 10),
            rankable("new-rare", 0.6, 1, 0),
            rankable("mid", 0.9, 24, 3),
        ];
        assert_eq!(
            rank_memories_with_strategy(&memories, "activation_score").unwrap(),
            vec!["mid", "new-rare", "old-popular"]
        );
        assert_eq!(
            rank_memories_with_strategy(&memories, "recency").unwrap(),
            vec!["new-rare", "mid", "old-popular"]
        );
        assert_eq!(
            rank_memories_with_strategy(&memories, "access_frequency").unwrap(),
            vec!["old-popular", "mid", "new-rare"]
        );
        assert_eq!(
            rank_memories_with_strategy(&memories, "combined").unwrap()[0],
            "mid"
        );
        assert_eq!(
            rank_memories_with_strategy(&memories, "relevance_boost").unwrap()[0],
            "mid"
        );
    }

    #[test]
    fn strategy_ranking_excludes_non_finite() {
        let memories = vec![rankable("ok", 0.5, 0, 0), rankable("bad", f64::NAN, 0, 100)];
        for strategy in RankingStrategy::ALL {
            assert_eq!(rank_with(&memories, strategy), vec!["ok"], "{strategy}");
        }
    }

    #[test]
    fn strategy_names_round_trip() {
        for strategy in RankingStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<RankingStrategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn temporal_decay_values() {
        let decayed = apply_temporal_decay(0.8, 10.0, |age| (-0.1 * age).exp()).unwrap();
        assert!((decayed - 0.8 * (-1.0_f64).exp()).abs() < 1e-12);

        assert!(matches!(
            apply_temporal_decay(-0.1, 10.0, |_| 1.0),
            Err(RecallError::InvalidInput { .. })
        ));
        assert!(matches!(
            apply_temporal_decay(0.8, -1.0, |_| 1.0),
            Err(RecallError::InvalidInput { .. })
        ));
        assert_eq!(
            apply_temporal_decay(0.8, 10.0, |_| 1.5),
            Err(RecallError::InvalidDecayOutput { value: 1.5 })
        );
    }

    #[test]
    fn decay_families() {
        assert!((DecayFunction::Exponential { rate: 0.1 }.multiplier(10.0) - (-1.0_f64).exp()).abs() < 1e-12);
        assert_eq!(DecayFunction::Linear { horizon: 10.0 }.multiplier(5.0), 0.5);
        assert_eq!(DecayFunction::Linear { horizon: 10.0 }.multiplier(20.0), 0.0);
        assert_eq!(DecayFunction::Logarithmic { rate: 1.0 }.multiplier(0.0), 1.0);
        let step = DecayFunction::Step { cutoff: 24.0, floor: 0.3 };
        assert_eq!(step.multiplier(23.9), 1.0);
        assert_eq!(step.multiplier(24.0), 0.3);
        assert_eq!(DecayFunction::None.apply(0.7, 1e6).unwrap(), 0.7);
        assert!((DecayFunction::half_life(168.0).apply(1.0, 168.0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn default_weight_profiles() {
        assert_eq!(default_weights("conversation"), ScoringWeights::new(0.4, 0.3, 0.2, 0.1));
        assert_eq!(default_weights("DOCUMENT"), ScoringWeights::new(0.3, 0.4, 0.2, 0.1));
        assert_eq!(default_weights("task"), ScoringWeights::new(0.35, 0.3, 0.15, 0.2));
        assert_eq!(default_weights("Query"), ScoringWeights::new(0.45, 0.25, 0.2, 0.1));
        assert_eq!(default_weights("mixed"), ScoringWeights::new(0.35, 0.35, 0.2, 0.1));
        assert_eq!(default_weights("unheard-of"), default_weights("mixed"));
    }

    fn any_score() -> impl Strategy<Value = f64> {
        prop_oneof![
            -2.0..2.0_f64,
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
        ]
    }

    proptest! {
        #[test]
        fn activation_always_in_unit_interval(
            e in any_score(), m in any_score(), s in any_score(), t in any_score(),
            we in any_score(), wm in any_score(), ws in any_score(), wt in any_score(),
        ) {
            let score = compute_activation_score(
                &scores(e, m, s, t),
                &ScoringWeights::new(we, wm, ws, wt),
            );
            prop_assert!(score.is_finite());
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn positive_scaling_is_invariant(
            e in 0.0..1.0_f64, m in 0.0..1.0_f64, s in 0.0..1.0_f64, t in 0.0..1.0_f64,
            we in 0.01..5.0_f64, wm in 0.01..5.0_f64, ws in 0.01..5.0_f64, wt in 0.01..5.0_f64,
            k in 0.1..100.0_f64,
        ) {
            let s = scores(e, m, s, t);
            let a = compute_activation_score(&s, &ScoringWeights::new(we, wm, ws, wt));
            let b = compute_activation_score(&s, &ScoringWeights::new(we * k, wm * k, ws * k, wt * k));
            prop_assert!((a - b).abs() < 1e-9);
        }

        #[test]
        fn decay_never_exceeds_base(base in 0.0..=1.0_f64, age in 0.0..10_000.0_f64, rate in 0.0..5.0_f64) {
            for decay in [
                DecayFunction::Exponential { rate },
                DecayFunction::Logarithmic { rate },
                DecayFunction::Linear { horizon: 100.0 },
                DecayFunction::Step { cutoff: 50.0, floor: 0.2 },
                DecayFunction::None,
            ] {
                let decayed = decay.apply(base, age).unwrap();
                prop_assert!(decayed <= base + 1e-12 && decayed >= 0.0);
            }
        }
    }
}
