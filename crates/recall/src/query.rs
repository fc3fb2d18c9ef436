// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `recall query`, `recall candidates` and `recall fingerprint`.

use std::io::IsTerminal;
use std::path::Path;

use recall_config::RecallConfig;
use recall_core::{ContextType, RecallError};
use recall_memory::{generate_fingerprint, Candidate, Decision, MemoryStore, RetrievalDecision};
use serde::Serialize;

use crate::corpus;

/// Output options for `recall query`.
#[derive(Debug, Default)]
pub struct QueryOptions {
    pub all: bool,
    pub json: bool,
    pub plain: bool,
}

/// Output options for `recall candidates`.
#[derive(Debug, Default)]
pub struct CandidateOptions {
    pub strategy: Option<String>,
    pub limit: Option<usize>,
    pub json: bool,
    pub plain: bool,
}

/// A decision joined with the memory text for display.
#[derive(Debug, Serialize)]
struct DecisionRow<'a> {
    #[serde(flatten)]
    decision: &'a RetrievalDecision,
    content: String,
}

/// Run `recall query`: decide which memories the text activates.
pub async fn run_query(
    config: &RecallConfig,
    memories: &Path,
    text: &str,
    context_type: ContextType,
    options: QueryOptions,
) -> Result<(), RecallError> {
    let store = corpus::load_store(config, memories).await?;
    let query = store.build_context(text, context_type).await?;
    let decisions = store.decide(&query).await?;

    let shown: Vec<&RetrievalDecision> = decisions
        .iter()
        .filter(|d| options.all || d.decision != Decision::Skipped)
        .collect();
    let rows = with_content(&store, &shown).await?;

    if options.json {
        print_json(&rows);
        return Ok(());
    }

    let use_color = !options.plain && std::io::stdout().is_terminal();
    println!();
    println!("  recall query ({context_type})");
    println!("  {}", "-".repeat(35));
    if rows.is_empty() {
        println!("    no memories activated");
    }
    for row in &rows {
        println!(
            "    {} {:.3}  {}",
            decision_label(row.decision.decision, use_color),
            row.decision.activation_score,
            row.content
        );
    }
    println!();
    Ok(())
}

/// Run `recall candidates`: every memory, ranked.
pub async fn run_candidates(
    config: &RecallConfig,
    memories: &Path,
    text: &str,
    context_type: ContextType,
    options: CandidateOptions,
) -> Result<(), RecallError> {
    let store = corpus::load_store(config, memories).await?;
    let query = store.build_context(text, context_type).await?;
    let mut candidates = store.ranked(&query, options.strategy.as_deref()).await?;
    if let Some(limit) = options.limit {
        candidates.truncate(limit);
    }

    if options.json {
        print_json(&candidates);
        return Ok(());
    }

    let strategy = options
        .strategy
        .as_deref()
        .unwrap_or(config.store.default_ranking.as_str());
    let use_color = !options.plain && std::io::stdout().is_terminal();
    println!();
    println!("  recall candidates (strategy: {strategy})");
    println!("  {}", "-".repeat(35));
    for (rank, candidate) in candidates.iter().enumerate() {
        println!("    {:>2}. {}", rank + 1, candidate_line(candidate, use_color));
    }
    println!();
    Ok(())
}

/// Run `recall fingerprint`: print the fingerprint of `text`.
pub async fn run_fingerprint(
    config: &RecallConfig,
    text: &str,
    context_type: ContextType,
) -> Result<(), RecallError> {
    let store = MemoryStore::from_config(config)?;
    let context = store.build_context(text, context_type).await?;
    println!("{}", generate_fingerprint(&context));
    Ok(())
}

async fn with_content<'a>(
    store: &MemoryStore,
    decisions: &[&'a RetrievalDecision],
) -> Result<Vec<DecisionRow<'a>>, RecallError> {
    let mut rows = Vec::with_capacity(decisions.len());
    for &decision in decisions {
        let memory = store.retrieve_memory(&decision.memory_id).await?;
        rows.push(DecisionRow {
            decision,
            content: memory.content,
        });
    }
    Ok(rows)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
    );
}

fn decision_label(decision: Decision, use_color: bool) -> String {
    let plain = format!("[{decision}]");
    if !use_color {
        return format!("{plain:<11}");
    }
    use colored::Colorize;
    let padded = format!("{plain:<11}");
    match decision {
        Decision::Retrieved => padded.green().to_string(),
        Decision::Deferred => padded.yellow().to_string(),
        Decision::Skipped => padded.dimmed().to_string(),
    }
}

fn candidate_line(candidate: &Candidate, use_color: bool) -> String {
    let marker = match (candidate.selected, use_color) {
        (true, true) => {
            use colored::Colorize;
            "✓".green().to_string()
        }
        (false, true) => " ".to_string(),
        (true, false) => "*".to_string(),
        (false, false) => " ".to_string(),
    };
    format!(
        "{marker} {:.3} conf {:.2} {:<10} {}",
        candidate.activation_score,
        candidate.confidence,
        candidate.relevance_type.to_string(),
        candidate.summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_memory::RelevanceType;

    fn candidate(selected: bool) -> Candidate {
        Candidate {
            memory_id: "m1".into(),
            activation_score: 0.5,
            relevance_type: RelevanceType::Semantic,
            summary: "tea notes".into(),
            confidence: 0.25,
            selected,
        }
    }

    #[test]
    fn plain_labels_are_padded() {
        assert_eq!(decision_label(Decision::Retrieved, false), "[retrieved]");
        assert_eq!(decision_label(Decision::Skipped, false), "[skipped]  ");
    }

    #[test]
    fn plain_candidate_line_marks_selection() {
        let line = candidate_line(&candidate(true), false);
        assert!(line.starts_with("* 0.500 conf 0.25 semantic"));
        assert!(line.ends_with("tea notes"));
        assert!(candidate_line(&candidate(false), false).starts_with("  0.500"));
    }

    #[test]
    fn decision_rows_flatten_into_json() {
        let decision = RetrievalDecision {
            memory_id: "m1".into(),
            activation_score: 0.4,
            threshold: 0.3,
            decision: Decision::Retrieved,
            reason: "score 0.400 meets threshold 0.300".into(),
            timestamp: chrono::Utc::now(),
        };
        let row = DecisionRow {
            decision: &decision,
            content: "tea".into(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["memory_id"], "m1");
        assert_eq!(json["decision"], "retrieved");
        assert_eq!(json["content"], "tea");
    }
}
