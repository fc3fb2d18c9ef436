// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The non-embedding similarity signals between a memory and a query.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use recall_core::RecallError;

use crate::scoring::DecayFunction;
use crate::text::{jaccard, word_set};
use crate::types::NormalizedMetadata;

/// Mean Jaccard overlap of topics and entity names.
///
/// Only fields populated on both sides contribute. When none are, fails with
/// `MissingMetadata` naming the absent fields.
pub fn metadata_similarity(
    memory: &NormalizedMetadata,
    query: &NormalizedMetadata,
) -> Result<f64, RecallError> {
    let mut parts = Vec::with_capacity(2);
    let mut missing = Vec::new();

    if !memory.topics.is_empty() && !query.topics.is_empty() {
        let a: BTreeSet<&str> = memory.topics.iter().map(String::as_str).collect();
        let b: BTreeSet<&str> = query.topics.iter().map(String::as_str).collect();
        parts.push(jaccard(&a, &b));
    } else {
        missing.push("topics".to_string());
    }

    if !memory.entities.is_empty() && !query.entities.is_empty() {
        let a: BTreeSet<&str> = memory.entities.iter().map(|e| e.name.as_str()).collect();
        let b: BTreeSet<&str> = query.entities.iter().map(|e| e.name.as_str()).collect();
        parts.push(jaccard(&a, &b));
    } else {
        missing.push("entities".to_string());
    }

    if parts.is_empty() {
        return Err(RecallError::MissingMetadata { fields: missing });
    }
    Ok(parts.iter().sum::<f64>() / parts.len() as f64)
}

/// Jaccard overlap of content words; the fallback for missing metadata.
pub fn content_overlap(a: &str, b: &str) -> f64 {
    jaccard(&word_set(a), &word_set(b))
}

/// Jaccard overlap of summary words.
pub fn summary_similarity(memory_summary: &str, query_summary: &str) -> f64 {
    content_overlap(memory_summary, query_summary)
}

/// Exponential recency of `last_accessed` relative to `now`, halving every
/// `half_life_hours`. Access times in the future count as age zero.
pub fn temporal_relevance(
    last_accessed: DateTime<Utc>,
    now: DateTime<Utc>,
    half_life_hours: f64,
) -> Result<f64, RecallError> {
    let age_hours = ((now - last_accessed).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
    DecayFunction::half_life(half_life_hours).apply(1.0, age_hours)
}
