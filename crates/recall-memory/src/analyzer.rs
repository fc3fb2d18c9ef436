// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context analysis: raw metadata and extractive summaries for a text.
//!
//! The analyzer is heuristic and local. It finds salient topics by token
//! frequency, entities by capitalization patterns, a coarse intent, the
//! structural layout (headings, list items, code blocks, paragraphs and
//! sentences), and builds a summary bounded by `summary_max_chars`.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::trace;

use crate::text::{is_stopword, tokenize};
use crate::types::{Entity, MemoryMetadata, StructuralElement, StructuralKind};

/// Maximum number of topics kept per text.
pub const MAX_TOPICS: usize = 8;

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+(\s+|$)").unwrap());
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+").unwrap());

const INTERROGATIVES: &[&str] = &[
    "what", "why", "how", "when", "where", "who", "which", "whose", "whom",
];
const REQUEST_OPENERS: &[&str] = &["please", "i need", "i want", "i'd like", "i would like"];
const IMPERATIVES: &[&str] = &[
    "add", "build", "create", "delete", "deploy", "do", "execute", "install", "list", "make",
    "open", "remove", "run", "set", "show", "start", "stop", "update",
];
const INFORM_OPENERS: &[&str] = &["explain", "describe", "note", "fyi"];
const QUESTION_WORDS: &[&str] = &["question", "ask", "asking", "help"];
const REQUEST_WORDS: &[&str] = &["request", "need", "want"];
const COMMAND_WORDS: &[&str] = &["command", "execute"];
const INFORM_WORDS: &[&str] = &["explain", "describe", "inform"];

/// Result of analyzing a text.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub metadata: MemoryMetadata,
    pub summary: String,
}

/// Heuristic text analyzer.
#[derive(Debug, Clone)]
pub struct ContextAnalyzer {
    summary_max_chars: usize,
}

impl ContextAnalyzer {
    pub fn new(summary_max_chars: usize) -> Self {
        Self {
            summary_max_chars: summary_max_chars.max(1),
        }
    }

    /// Analyze `text`, stamping it with `at` as its temporal marker.
    pub fn analyze(&self, text: &str, at: DateTime<Utc>) -> Analysis {
        let structural_elements = structural_elements(text);
        let summary = self.summarize(text, &structural_elements);
        let metadata = MemoryMetadata {
            topics: topics(text),
            entities: entities(text),
            intent: detect_intent(text).to_string(),
            temporal_markers: vec![at],
            structural_elements,
        };
        trace!(
            topics = metadata.topics.len(),
            entities = metadata.entities.len(),
            elements = metadata.structural_elements.len(),
            intent = %metadata.intent,
            "analyzed text"
        );
        Analysis { metadata, summary }
    }

    /// Extractive summary of `text` no longer than `summary_max_chars`.
    pub fn summarize(&self, text: &str, elements: &[StructuralElement]) -> String {
        let max = self.summary_max_chars;
        let sentences: Vec<&str> = elements
            .iter()
            .filter(|e| e.kind == StructuralKind::Sentence)
            .map(|e| e.content.as_str())
            .collect();

        let normalized;
        let pieces: Vec<&str> = if sentences.is_empty() {
            normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            vec![normalized.as_str()]
        } else {
            sentences
        };

        let mut summary = String::new();
        for piece in pieces {
            let needed = piece.chars().count() + usize::from(!summary.is_empty());
            if summary.chars().count() + needed <= max {
                if !summary.is_empty() {
                    summary.push(' ');
                }
                summary.push_str(piece);
            } else {
                if summary.is_empty() {
                    summary = truncate_chars(piece, max);
                }
                break;
            }
        }
        summary
    }
}

/// Truncate to at most `max` chars, preferring a word boundary and ending with `…`.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(1);
    let head: String = text.chars().take(keep).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => head[..idx].trim_end(),
        _ => head.as_str(),
    };
    format!("{cut}…")
}

/// Most frequent non-stopword tokens, lowercased, ties by first appearance.
fn topics(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (order, token) in tokenize(text).into_iter().enumerate() {
        let word = token.text.to_lowercase();
        if word.chars().count() < 3 || is_stopword(&word) || word.chars().all(|c| c.is_numeric())
        {
            continue;
        }
        counts.entry(word).or_insert((0, order)).0 += 1;
    }
    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked
        .into_iter()
        .take(MAX_TOPICS)
        .map(|(word, _)| word)
        .collect()
}

fn is_sentence_start(text: &str, offset: usize) -> bool {
    let before = text[..offset].trim_end_matches([' ', '\t']);
    match before.chars().last() {
        None => true,
        Some(c) => matches!(c, '.' | '!' | '?' | '\n' | '#' | '-' | '*' | '>' | ':' | '"' | '('),
    }
}

/// Acronyms, camel-case technology names and mid-sentence capitalized words.
fn entities(text: &str) -> Vec<Entity> {
    let mut found: Vec<Entity> = Vec::new();
    for token in tokenize(text) {
        let word = token.text;
        let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
        let Some(first) = word.chars().next() else {
            continue;
        };
        if !first.is_uppercase() || letters.is_empty() {
            continue;
        }

        let (entity_type, confidence) = if letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
        {
            ("acronym", 0.8)
        } else if letters.iter().skip(1).any(|c| c.is_uppercase()) {
            ("technology", 0.7)
        } else if !is_sentence_start(text, token.offset)
            && letters.len() >= 2
            && !is_stopword(&word.to_lowercase())
        {
            ("proper_noun", 0.6)
        } else {
            continue;
        };

        if found.iter().any(|e| e.name == word) {
            continue;
        }
        found.push(Entity {
            name: word.to_string(),
            entity_type: entity_type.to_string(),
            confidence,
        });
    }
    found
}

/// Coarse intent: question, request, command, inform, statement, or empty
/// for blank text.
///
/// The opening word and the intent keywords anywhere in the text both count;
/// the first matching category in that order wins.
pub fn detect_intent(text: &str) -> &'static str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "";
    }
    let lower = trimmed.to_lowercase();
    let words: Vec<&str> = tokenize(&lower).into_iter().map(|t| t.text).collect();
    let first = words.first().copied().unwrap_or_default();
    let mentions = |keywords: &[&str]| words.iter().any(|w| keywords.contains(w));

    if trimmed.ends_with('?') || INTERROGATIVES.contains(&first) || mentions(QUESTION_WORDS) {
        "question"
    } else if REQUEST_OPENERS.iter().any(|opener| lower.starts_with(opener))
        || mentions(REQUEST_WORDS)
    {
        "request"
    } else if IMPERATIVES.contains(&first) || mentions(COMMAND_WORDS) {
        "command"
    } else if INFORM_OPENERS.contains(&first) || mentions(INFORM_WORDS) {
        "inform"
    } else {
        "statement"
    }
}

fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(paragraph) {
        let end = m.start() + m.as_str().trim_end().len();
        let sentence = paragraph[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }
    let rest = paragraph[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Layout of a text in reading order.
fn structural_elements(text: &str) -> Vec<StructuralElement> {
    enum Block {
        Heading(String),
        ListItem(String),
        Code(String),
        Paragraph(String),
    }

    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut code: Option<Vec<&str>> = None;

    fn flush(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    }

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            match code.take() {
                Some(lines) => blocks.push(Block::Code(lines.join("\n"))),
                None => {
                    flush(&mut paragraph, &mut blocks);
                    code = Some(Vec::new());
                }
            }
            continue;
        }
        if let Some(lines) = code.as_mut() {
            lines.push(line);
            continue;
        }
        if trimmed.is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else if trimmed.starts_with('#') {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading(trimmed.trim_start_matches('#').trim().to_string()));
        } else if let Some(marker) = LIST_MARKER.find(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::ListItem(line[marker.end()..].trim().to_string()));
        } else {
            paragraph.push(trimmed);
        }
    }
    if let Some(lines) = code {
        blocks.push(Block::Code(lines.join("\n")));
    }
    flush(&mut paragraph, &mut blocks);

    let paragraphs = blocks
        .iter()
        .filter(|b| matches!(b, Block::Paragraph(_)))
        .count();

    let mut elements = Vec::new();
    let mut push = |kind: StructuralKind, content: String| {
        let position = elements.len();
        elements.push(StructuralElement {
            kind,
            content,
            position,
        });
    };
    for block in blocks {
        match block {
            Block::Heading(content) => push(StructuralKind::Heading, content),
            Block::ListItem(content) => push(StructuralKind::ListItem, content),
            Block::Code(content) => push(StructuralKind::CodeBlock, content),
            Block::Paragraph(content) => {
                if paragraphs > 1 {
                    push(StructuralKind::Paragraph, content.clone());
                }
                for sentence in split_sentences(&content) {
                    push(StructuralKind::Sentence, sentence);
                }
            }
        }
    }
    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> Analysis {
        ContextAnalyzer::new(200).analyze(text, Utc::now())
    }

    #[test]
    fn topics_are_lowercase_and_ranked_by_frequency() {
        let a = analyze("Rust ownership. Ownership rules make Rust safe; rust is fast.");
        assert_eq!(a.metadata.topics[0], "rust");
        assert_eq!(a.metadata.topics[1], "ownership");
        assert!(a.metadata.topics.iter().all(|t| t == &t.to_lowercase()));
        assert!(a.metadata.topics.len() <= MAX_TOPICS);
    }

    #[test]
    fn entities_by_capitalization() {
        let a = analyze("I use TypeScript with the API from Google daily.");
        let names: Vec<(&str, &str)> = a
            .metadata
            .entities
            .iter()
            .map(|e| (e.name.as_str(), e.entity_type.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("TypeScript", "technology"),
                ("API", "acronym"),
                ("Google", "proper_noun")
            ]
        );
    }

    #[test]
    fn sentence_initial_capitals_are_not_entities() {
        let a = analyze("Bread needs flour. Water helps too.");
        assert!(a.metadata.entities.is_empty());
    }

    #[test]
    fn entities_are_unique_by_name() {
        let a = analyze("the NASA plan and the NASA budget");
        assert_eq!(a.metadata.entities.len(), 1);
    }

    #[test]
    fn intent_detection() {
        assert_eq!(detect_intent("What is Rust?"), "question");
        assert_eq!(detect_intent("how do I bake bread"), "question");
        assert_eq!(detect_intent("Please summarize this"), "request");
        assert_eq!(detect_intent("I need a new laptop"), "request");
        assert_eq!(detect_intent("Run the tests now"), "command");
        assert_eq!(detect_intent("Explain lifetimes"), "inform");
        assert_eq!(detect_intent("I love sourdough."), "statement");
        assert_eq!(detect_intent("question ask help"), "question");
        assert_eq!(detect_intent("We want faster builds"), "request");
        assert_eq!(detect_intent("   "), "");
    }

    #[test]
    fn structure_covers_headings_lists_code_and_sentences() {
        let text = "# Setup\n\n- install rust\n- run cargo\n\n```\nfn main() {}\n```\n\nIt works. Done!";
        let kinds: Vec<StructuralKind> = analyze(text)
            .metadata
            .structural_elements
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                StructuralKind::Heading,
                StructuralKind::ListItem,
                StructuralKind::ListItem,
                StructuralKind::CodeBlock,
                StructuralKind::Sentence,
                StructuralKind::Sentence,
            ]
        );
    }

    #[test]
    fn multiple_paragraphs_emit_paragraph_elements() {
        let elements = analyze("First part here.\n\nSecond part here.")
            .metadata
            .structural_elements;
        assert_eq!(elements.len(), 4);
        assert_eq!(elements[0].kind, StructuralKind::Paragraph);
        assert_eq!(elements[3].position, 3);
    }

    #[test]
    fn summary_is_bounded() {
        let analyzer = ContextAnalyzer::new(40);
        let text = "This first sentence is short. The second sentence is quite a bit longer than the first.";
        let a = analyzer.analyze(text, Utc::now());
        assert_eq!(a.summary, "This first sentence is short.");

        let long = "word ".repeat(50);
        let a = analyzer.analyze(&long, Utc::now());
        assert!(a.summary.chars().count() <= 40);
        assert!(a.summary.ends_with('…'));
    }

    #[test]
    fn empty_text_yields_empty_metadata() {
        let at = Utc::now();
        let a = ContextAnalyzer::new(200).analyze("", at);
        assert!(a.metadata.topics.is_empty());
        assert!(a.metadata.structural_elements.is_empty());
        assert_eq!(a.metadata.temporal_markers, vec![at]);
        assert_eq!(a.summary, "");
    }
}
