// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Three-part semantic fingerprints: `structural|semantic|contextual`.
//!
//! The structural segment encodes element kinds and positions, the semantic
//! segment is a short SHA-256 digest of the normalized vocabulary, and the
//! contextual segment is `{INTENT}-{LENGTH}-{DENSITY}-{TYPE}`. No segment
//! ever contains literal content.

use sha2::{Digest, Sha256};

use crate::extractor::extract_metadata;
use crate::types::{Context, StructuralElement};

/// Hex characters kept from the semantic digest.
const SEMANTIC_HEX_LEN: usize = 12;

/// Fingerprint of `context`. Identical input always yields identical output.
pub fn generate_fingerprint(context: &Context) -> String {
    let normalized = extract_metadata(context);

    let mut entity_names: Vec<&str> = normalized.entities.iter().map(|e| e.name.as_str()).collect();
    entity_names.sort_unstable();
    let mut topics: Vec<&str> = normalized.topics.iter().map(String::as_str).collect();
    topics.sort_unstable();

    let structural = structural_segment(&context.metadata.structural_elements);
    let semantic = semantic_segment(&topics, &entity_names, &normalized.concepts);
    let contextual = format!(
        "{}-{}-{}-{}",
        intent_code(&context.metadata.intent),
        length_bucket(context.content.chars().count()),
        density_bucket(normalized.importance),
        context.context_type.code()
    );
    format!("{structural}|{semantic}|{contextual}")
}

fn structural_segment(elements: &[StructuralElement]) -> String {
    let mut segment = format!("S{}", elements.len());
    for element in elements {
        segment.push(':');
        segment.push(element.kind.code());
        segment.push_str(&element.position.to_string());
    }
    segment
}

fn semantic_segment(topics: &[&str], entities: &[&str], concepts: &[String]) -> String {
    if topics.is_empty() && entities.is_empty() && concepts.is_empty() {
        return "none".to_string();
    }
    let mut hasher = Sha256::new();
    for (tag, items) in [
        ("t", topics.join("\u{1f}")),
        ("e", entities.join("\u{1f}")),
        ("c", concepts.join("\u{1f}")),
    ] {
        hasher.update(tag.as_bytes());
        hasher.update(b"\x1e");
        hasher.update(items.as_bytes());
        hasher.update(b"\x1d");
    }
    let digest = hex::encode(hasher.finalize());
    digest[..SEMANTIC_HEX_LEN].to_string()
}

/// Category code for a free-form intent label.
pub fn intent_code(intent: &str) -> &'static str {
    const CATEGORIES: &[(&str, &[&str])] = &[
        (
            "QUESTION",
            &["question", "questions", "ask", "asks", "asked", "asking", "help", "helps"],
        ),
        ("REQUEST", &["request", "requests", "need", "needs", "want", "wants"]),
        ("COMMAND", &["command", "commands", "do", "execute", "executes"]),
        ("INFORM", &["explain", "explains", "describe", "describes", "inform", "informs"]),
    ];
    let intent = intent.to_lowercase();
    let words: Vec<&str> = intent
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    CATEGORIES
        .iter()
        .find(|(_, vocabulary)| words.iter().any(|w| vocabulary.contains(w)))
        .map(|(code, _)| *code)
        .unwrap_or("OTHER")
}

fn length_bucket(chars: usize) -> &'static str {
    match chars {
        0..40 => "XS",
        40..160 => "S",
        160..640 => "M",
        _ => "L",
    }
}

fn density_bucket(importance: f64) -> &'static str {
    if importance < 0.25 {
        "D0"
    } else if importance < 0.5 {
        "D1"
    } else if importance < 0.75 {
        "D2"
    } else {
        "D3"
    }
}
