// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory activation and retrieval engine for Recall.
//!
//! Stores short text records in process and decides, for a query, which of
//! them are relevant enough to surface, how relevant, and in what order.
//!
//! ## Architecture
//!
//! - **ContextAnalyzer**: topics, entities, intent, structure and summary of a text
//! - **extract_metadata**: normalized metadata and importance
//! - **generate_fingerprint**: `structural|semantic|contextual` digest
//! - **scoring**: activation score, ranking strategies, temporal decay
//! - **MemoryStore**: memories, similarity signals and retrieval decisions
//! - **HashingEmbedder**: local feature-hashing embedding adapter
//! - **Clock**: injectable wall clock

pub mod analyzer;
pub mod clock;
pub mod embedder;
pub mod extractor;
pub mod fingerprint;
pub mod scoring;
pub mod similarity;
pub mod store;
pub mod text;
pub mod types;

pub use analyzer::{Analysis, ContextAnalyzer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use embedder::HashingEmbedder;
pub use extractor::extract_metadata;
pub use fingerprint::generate_fingerprint;
pub use scoring::{
    apply_temporal_decay, compute_activation_score, default_weights, rank_memories_by_activation,
    rank_memories_with_strategy, DecayFunction, RankableMemory, RankingStrategy,
};
pub use store::MemoryStore;
pub use types::*;
