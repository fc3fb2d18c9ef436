// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metadata normalization.
//!
//! Turns the raw metadata of a [`Context`] into deduplicated topics,
//! entities and concepts, typed relationships and an importance score.
//! Pure and deterministic: the same context always yields the same result.

use std::collections::BTreeSet;

use recall_core::RecallError;

use crate::text::{content_words, tokenize};
use crate::types::{
    Context, Entity, MemoryMetadata, NormalizedMetadata, Relationship, RelationshipKind,
};

/// Minimum length of a content token to count as a concept.
const MIN_CONCEPT_LEN: usize = 4;

/// Normalize the metadata of `context`.
pub fn extract_metadata(context: &Context) -> NormalizedMetadata {
    if context.content.trim().is_empty() {
        return NormalizedMetadata::default();
    }
    let metadata = &context.metadata;

    let mut topics: Vec<String> = Vec::new();
    for topic in &metadata.topics {
        let topic = topic.trim().to_lowercase();
        if !topic.is_empty() && !topics.contains(&topic) {
            topics.push(topic);
        }
    }

    let mut entities: Vec<Entity> = Vec::new();
    for entity in &metadata.entities {
        if !entities.iter().any(|e| e.name == entity.name) {
            entities.push(entity.clone());
        }
    }

    let concepts: BTreeSet<String> = content_words(&context.content)
        .into_iter()
        .filter(|w| w.chars().count() >= MIN_CONCEPT_LEN)
        .chain(topics.iter().cloned())
        .chain(entities.iter().map(|e| e.name.to_lowercase()))
        .collect();

    let relationships = relationships(metadata, &entities, &topics);
    let importance = importance(
        topics.len(),
        entities.len(),
        metadata.structural_elements.len(),
        context.content.chars().count(),
    );

    NormalizedMetadata {
        topics,
        entities,
        concepts: concepts.into_iter().collect(),
        relationships,
        importance,
    }
}

/// `min(1, 0.1·topics + 0.1·entities + 0.05·structural + min(0.3, chars / 2000))`.
pub fn importance(topics: usize, entities: usize, structural: usize, chars: usize) -> f64 {
    if chars == 0 {
        return 0.0;
    }
    let length_term = (chars as f64 / 2000.0).min(0.3);
    let score = 0.1 * topics as f64 + 0.1 * entities as f64 + 0.05 * structural as f64 + length_term;
    score.clamp(0.0, 1.0)
}

fn relationships(
    metadata: &MemoryMetadata,
    entities: &[Entity],
    topics: &[String],
) -> Vec<Relationship> {
    let elements = &metadata.structural_elements;
    let label = |i: usize| format!("{}{}", elements[i].kind.code(), elements[i].position);

    let mut edges: Vec<Relationship> = (1..elements.len())
        .map(|i| Relationship {
            kind: RelationshipKind::Hierarchical,
            source: label(i - 1),
            target: label(i),
        })
        .collect();

    for element in elements {
        let words: BTreeSet<String> = tokenize(&element.content)
            .into_iter()
            .map(|t| t.text.to_lowercase())
            .collect();
        for entity in entities.iter().filter(|e| element.content.contains(&e.name)) {
            let entity_word = entity.name.to_lowercase();
            for topic in topics.iter().filter(|t| words.contains(*t) && **t != entity_word) {
                let edge = Relationship {
                    kind: RelationshipKind::Association,
                    source: entity.name.clone(),
                    target: topic.clone(),
                };
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
    }
    edges
}

/// Reject caller-supplied metadata that cannot be normalized.
pub fn validate_metadata(metadata: &MemoryMetadata) -> Result<(), RecallError> {
    if let Some(entity) = metadata.entities.iter().find(|e| e.name.trim().is_empty()) {
        return Err(RecallError::MetadataExtraction {
            reason: format!("entity of type `{}` has an empty name", entity.entity_type),
        });
    }
    if let Some(entity) = metadata
        .entities
        .iter()
        .find(|e| !e.confidence.is_finite() || !(0.0..=1.0).contains(&e.confidence))
    {
        return Err(RecallError::MetadataExtraction {
            reason: format!(
                "entity `{}` has confidence {} outside [0, 1]",
                entity.name, entity.confidence
            ),
        });
    }
    Ok(())
}
