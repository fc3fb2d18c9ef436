// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process memory store with activation scoring and retrieval decisions.
//!
//! Each memory lives in a slot holding an atomically swapped snapshot and a
//! write guard. Readers always see a whole `Memory`; writers take the guard
//! without blocking, and a busy guard surfaces as `ConcurrentAccess`, which is
//! resolved through the Recovery Coordinator's backoff.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::{self, FutureExt};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use recall_config::{runtime_violations, ActivationConfig, RecallConfig, StoreConfig, WeightsConfig};
use recall_core::traits::EmbeddingAdapter;
use recall_core::types::{EmbeddingInput, HealthStatus};
use recall_core::{ContextType, RecallError};
use recall_resilience::{RecoveryContext, RecoveryCoordinator, RecoveryOptions};

use crate::analyzer::ContextAnalyzer;
use crate::clock::{Clock, SystemClock};
use crate::embedder::HashingEmbedder;
use crate::extractor::{extract_metadata, validate_metadata};
use crate::fingerprint::generate_fingerprint;
use crate::scoring::{
    compute_activation_score, rank_memories_by_activation, rank_with, weights_for,
    RankableMemory, RankingStrategy,
};
use crate::similarity::{content_overlap, metadata_similarity, summary_similarity, temporal_relevance};
use crate::types::{
    cosine_similarity, Candidate, Context, Decision, Embedding, Memory, MemoryMetadata,
    NormalizedMetadata, RelevanceType, RetrievalDecision, ScoringWeights, SimilarityScores,
    SystemStats,
};

struct MemorySlot {
    current: ArcSwap<Memory>,
    writer: Arc<Mutex<()>>,
}

impl MemorySlot {
    fn new(memory: Memory) -> Self {
        Self {
            current: ArcSwap::from_pointee(memory),
            writer: Arc::new(Mutex::new(())),
        }
    }
}

/// Everything derived from a memory's content.
struct Representation {
    embedding: Embedding,
    metadata: MemoryMetadata,
    normalized: NormalizedMetadata,
    summary: String,
    fingerprint: String,
    context_type: ContextType,
}

/// One memory scored against a query.
struct Scored {
    memory: Arc<Memory>,
    scores: SimilarityScores,
    weights: ScoringWeights,
    activation: f64,
}

/// A claimed capacity slot, released on drop unless committed.
struct Reservation<'a> {
    count: &'a AtomicUsize,
    committed: bool,
}

impl Reservation<'_> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.count.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// The memory store.
pub struct MemoryStore {
    slots: DashMap<String, Arc<MemorySlot>>,
    /// Stored memories plus stores still in flight.
    reserved: AtomicUsize,
    fingerprint_index: DashMap<String, BTreeSet<String>>,
    embedding_cache: DashMap<String, Embedding>,
    last_average: ArcSwapOption<f64>,
    last_cleanup: ArcSwapOption<DateTime<Utc>>,
    analyzer: ContextAnalyzer,
    embedder: Arc<dyn EmbeddingAdapter>,
    recovery: Arc<RecoveryCoordinator>,
    clock: Arc<dyn Clock>,
    activation: ActivationConfig,
    weights: WeightsConfig,
    config: StoreConfig,
}

impl MemoryStore {
    /// Create a store around `embedder`, sharing `recovery` with other components.
    ///
    /// Fails with `InvalidConfiguration` when a setting is out of range, and
    /// with `Initialization` when the embedder's dimensionality differs from
    /// `store.embedding_dimensions`. Retrieval thresholds are not checked
    /// here; an invalid threshold falls back to the default at query time.
    pub fn new(
        config: &RecallConfig,
        embedder: Arc<dyn EmbeddingAdapter>,
        recovery: Arc<RecoveryCoordinator>,
    ) -> Result<Self, RecallError> {
        let violations = runtime_violations(config);
        if let Some(first) = violations.first() {
            let reason = violations
                .iter()
                .map(|v| format!("{} {}", v.key, v.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RecallError::InvalidConfiguration {
                key: first.key.clone(),
                reason,
            });
        }
        if embedder.dimensions() != config.store.embedding_dimensions {
            return Err(RecallError::Initialization(format!(
                "embedder `{}` produces {} dimensions but the store expects {}",
                embedder.name(),
                embedder.dimensions(),
                config.store.embedding_dimensions
            )));
        }
        Ok(Self {
            slots: DashMap::new(),
            reserved: AtomicUsize::new(0),
            fingerprint_index: DashMap::new(),
            embedding_cache: DashMap::new(),
            last_average: ArcSwapOption::empty(),
            last_cleanup: ArcSwapOption::empty(),
            analyzer: ContextAnalyzer::new(config.store.summary_max_chars),
            embedder,
            recovery,
            clock: Arc::new(SystemClock),
            activation: config.activation.clone(),
            weights: config.weights.clone(),
            config: config.store.clone(),
        })
    }

    /// Create a store with the local hashing embedder and a coordinator
    /// built from `config.recovery`.
    pub fn from_config(config: &RecallConfig) -> Result<Self, RecallError> {
        let embedder = HashingEmbedder::new(config.store.embedding_dimensions)?;
        let recovery = RecoveryCoordinator::new(
            config.recovery.max_retries,
            Duration::from_millis(config.recovery.base_delay_ms),
        );
        Self::new(config, Arc::new(embedder), Arc::new(recovery))
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Analyze and embed `text` into a query context.
    pub async fn build_context(
        &self,
        text: &str,
        context_type: ContextType,
    ) -> Result<Context, RecallError> {
        let analysis = self.analyzer.analyze(text, self.clock.now());
        let embedding = self.generate_embedding(text, "build_context", None).await?;
        Ok(Context {
            content: text.to_string(),
            embedding,
            metadata: analysis.metadata,
            summary: analysis.summary,
            context_type,
        })
    }

    /// Store `content` as a new memory and return its id.
    ///
    /// A supplied `context` contributes its metadata, summary, context type
    /// and (when it describes the same content) its embedding.
    pub async fn store_memory(
        &self,
        content: &str,
        context: Option<&Context>,
    ) -> Result<String, RecallError> {
        let reservation = self.reserve()?;

        let id = Uuid::new_v4().to_string();
        let fallback_type = context.map(|c| c.context_type).unwrap_or_default();
        let repr = self
            .represent(&id, content, context, fallback_type, "store_memory")
            .await?;

        let now = self.clock.now();
        let memory = Memory {
            id: id.clone(),
            content: content.to_string(),
            embedding: Some(repr.embedding),
            metadata: repr.metadata,
            normalized: repr.normalized,
            summary: repr.summary,
            fingerprint: repr.fingerprint,
            context_type: repr.context_type,
            created_at: now,
            last_accessed: now,
            access_count: 0,
        };
        self.index_insert(&memory.fingerprint, &id);
        self.slots.insert(id.clone(), Arc::new(MemorySlot::new(memory)));
        reservation.commit();

        metrics::counter!("recall_memories_stored_total").increment(1);
        info!(memory_id = %id, total = self.slots.len(), "stored memory");
        Ok(id)
    }

    /// Fetch a memory, recording the access.
    pub async fn retrieve_memory(&self, id: &str) -> Result<Memory, RecallError> {
        let slot = self.slot(id)?;
        let _guard = self.lock_for_write(&slot, id, "retrieve_memory").await?;
        if !self.slots.contains_key(id) {
            return Err(not_found(id));
        }

        let mut memory = Memory::clone(&slot.current.load());
        memory.access_count += 1;
        memory.last_accessed = self.clock.now();
        slot.current.store(Arc::new(memory.clone()));
        debug!(memory_id = id, access_count = memory.access_count, "retrieved memory");
        Ok(memory)
    }

    /// Replace a memory's content, regenerating its embedding, metadata,
    /// summary and fingerprint. Identity and access history are kept.
    pub async fn update_memory(&self, id: &str, content: &str) -> Result<Memory, RecallError> {
        let slot = self.slot(id)?;
        let _guard = self.lock_for_write(&slot, id, "update_memory").await?;
        if !self.slots.contains_key(id) {
            return Err(not_found(id));
        }

        let previous = slot.current.load_full();
        let repr = self
            .represent(id, content, None, previous.context_type, "update_memory")
            .await?;

        let mut memory = Memory::clone(&previous);
        memory.content = content.to_string();
        memory.embedding = Some(repr.embedding);
        memory.metadata = repr.metadata;
        memory.normalized = repr.normalized;
        memory.summary = repr.summary;
        memory.fingerprint = repr.fingerprint;

        self.index_remove(&previous.fingerprint, id);
        self.index_insert(&memory.fingerprint, id);
        slot.current.store(Arc::new(memory.clone()));
        info!(memory_id = id, "updated memory");
        Ok(memory)
    }

    /// Remove a memory.
    pub async fn delete_memory(&self, id: &str) -> Result<(), RecallError> {
        let slot = self.slot(id)?;
        let _guard = self.lock_for_write(&slot, id, "delete_memory").await?;
        let Some((_, removed)) = self.slots.remove(id) else {
            return Err(not_found(id));
        };
        self.reserved.fetch_sub(1, Ordering::AcqRel);
        self.index_remove(&removed.current.load().fingerprint, id);
        info!(memory_id = id, total = self.slots.len(), "deleted memory");
        Ok(())
    }

    /// Remove memories last accessed before `now - older_than`.
    /// Returns the number removed.
    pub async fn cleanup(&self, older_than: chrono::Duration) -> Result<usize, RecallError> {
        let now = self.clock.now();
        let cutoff = now - older_than;
        let stale: Vec<String> = self
            .slots
            .iter()
            .filter(|entry| entry.value().current.load().last_accessed < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in stale {
            match self.delete_memory(&id).await {
                Ok(()) => removed += 1,
                Err(RecallError::MemoryNotFound { .. }) => {}
                Err(error) => return Err(error),
            }
        }
        self.last_cleanup.store(Some(Arc::new(now)));
        info!(removed, cutoff = %cutoff, "cleanup finished");
        Ok(removed)
    }

    /// Retrieval decisions for every stored memory, best first.
    pub async fn decide(&self, query: &Context) -> Result<Vec<RetrievalDecision>, RecallError> {
        let threshold = self.threshold(query.context_type).await?;
        let margin = self.margin();
        let now = self.clock.now();
        let scored = self.score_all(query).await?;

        Ok(self
            .in_activation_order(&scored)
            .into_iter()
            .map(|s| {
                let (decision, reason) = classify(s.activation, threshold, margin);
                RetrievalDecision {
                    memory_id: s.memory.id.clone(),
                    activation_score: s.activation,
                    threshold,
                    decision,
                    reason,
                    timestamp: now,
                }
            })
            .collect())
    }

    /// Every stored memory as a candidate, ranked by activation descending.
    pub async fn get_all_candidate_memories(
        &self,
        query: &Context,
    ) -> Result<Vec<Candidate>, RecallError> {
        let threshold = self.threshold(query.context_type).await?;
        let margin = self.margin();
        let scored = self.score_all(query).await?;
        Ok(self
            .in_activation_order(&scored)
            .into_iter()
            .map(|s| candidate(s, threshold, margin))
            .collect())
    }

    /// Candidates whose activation clears the threshold for the query's type.
    pub async fn get_memory_awareness(&self, query: &Context) -> Result<Vec<Candidate>, RecallError> {
        let candidates = self.get_all_candidate_memories(query).await?;
        Ok(candidates.into_iter().filter(|c| c.selected).collect())
    }

    /// All candidates ordered by a named ranking strategy, or by
    /// `store.default_ranking` when none is given.
    pub async fn ranked(
        &self,
        query: &Context,
        strategy: Option<&str>,
    ) -> Result<Vec<Candidate>, RecallError> {
        let strategy: RankingStrategy = strategy
            .unwrap_or(self.config.default_ranking.as_str())
            .parse()?;
        let threshold = self.threshold(query.context_type).await?;
        let margin = self.margin();
        let scored = self.score_all(query).await?;

        let rankable: Vec<RankableMemory> = scored
            .iter()
            .map(|s| RankableMemory {
                id: s.memory.id.clone(),
                activation_score: s.activation,
                timestamp: s.memory.last_accessed,
                access_count: s.memory.access_count,
            })
            .collect();
        let by_id: HashMap<&str, &Scored> =
            scored.iter().map(|s| (s.memory.id.as_str(), s)).collect();

        Ok(rank_with(&rankable, strategy)
            .iter()
            .filter_map(|id| by_id.get(id.as_str()))
            .map(|s| candidate(s, threshold, margin))
            .collect())
    }

    /// Store-wide statistics.
    pub fn get_system_stats(&self) -> SystemStats {
        let memory_usage_estimate = self
            .slots
            .iter()
            .map(|entry| estimate_size(&entry.value().current.load()))
            .sum();
        SystemStats {
            total_memories: self.slots.len(),
            average_activation_score: self.last_average.load().as_deref().copied().unwrap_or(0.0),
            memory_usage_estimate,
            last_cleanup: self.last_cleanup.load().as_deref().copied(),
        }
    }

    /// Memories whose fingerprint equals `fingerprint`, ordered by id.
    ///
    /// An inconsistent index is rebuilt from the stored memories and the
    /// lookup retried once.
    pub async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<Memory>, RecallError> {
        match self.lookup_fingerprint(fingerprint) {
            Ok(found) => Ok(found),
            Err(error) => {
                let context = RecoveryContext::new("find_by_fingerprint");
                let options = RecoveryOptions::default().with_retry(|| {
                    self.rebuild_index();
                    future::ready(self.lookup_fingerprint(fingerprint)).boxed()
                });
                self.recovery.handle(error, &context, options).await.into_result()
            }
        }
    }

    /// Rebuild the fingerprint index from the stored memories.
    /// Returns the number of distinct fingerprints.
    pub fn rebuild_index(&self) -> usize {
        self.fingerprint_index.clear();
        for entry in self.slots.iter() {
            let memory = entry.value().current.load();
            self.index_insert(&memory.fingerprint, &memory.id);
        }
        let fingerprints = self.fingerprint_index.len();
        info!(fingerprints, memories = self.slots.len(), "rebuilt fingerprint index");
        fingerprints
    }

    /// Health of the embedding adapter and the fingerprint index.
    pub async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        let embedder = self.embedder.health_check().await?;
        if let HealthStatus::Unhealthy(_) = embedder {
            return Ok(embedder);
        }
        if let Err(error) = self.verify_index() {
            return Ok(HealthStatus::Degraded(error.to_string()));
        }
        Ok(embedder)
    }

    fn slot(&self, id: &str) -> Result<Arc<MemorySlot>, RecallError> {
        self.slots
            .get(id)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| not_found(id))
    }

    /// Take the slot's write guard, backing off while another writer holds it.
    async fn lock_for_write(
        &self,
        slot: &Arc<MemorySlot>,
        id: &str,
        operation: &str,
    ) -> Result<OwnedMutexGuard<()>, RecallError> {
        let try_lock = || {
            Arc::clone(&slot.writer)
                .try_lock_owned()
                .map_err(|_| RecallError::ConcurrentAccess {
                    memory_id: id.to_string(),
                    operation: operation.to_string(),
                })
        };
        match try_lock() {
            Ok(guard) => Ok(guard),
            Err(error) => {
                debug!(memory_id = id, operation, "write guard busy");
                let context = RecoveryContext::for_memory(operation, id);
                let options =
                    RecoveryOptions::default().with_retry(|| future::ready(try_lock()).boxed());
                self.recovery.handle(error, &context, options).await.into_result()
            }
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Embedding, RecallError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        let model = output.model;
        let vector = output.embeddings.into_iter().next().ok_or_else(|| {
            RecallError::EmbeddingGeneration {
                model: model.clone(),
                reason: "adapter returned no embeddings".to_string(),
            }
        })?;
        Ok(Embedding::new(vector, model))
    }

    /// Embed `text`; on failure retry once, then fall back to the cached
    /// embedding of the same content if there is one.
    /// Claim room for one more memory, counting stores still in flight.
    fn reserve(&self) -> Result<Reservation<'_>, RecallError> {
        let limit = self.config.max_memories;
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then_some(n + 1))
            .map(|_| Reservation {
                count: &self.reserved,
                committed: false,
            })
            .map_err(|current| {
                warn!(current, limit, "memory store is full");
                RecallError::CapacityExceeded { current, limit }
            })
    }

    async fn generate_embedding(
        &self,
        text: &str,
        operation: &str,
        memory_id: Option<&str>,
    ) -> Result<Embedding, RecallError> {
        let key = content_key(text);
        let embedding = match self.embed_one(text).await {
            Ok(embedding) => embedding,
            Err(error) => {
                let context = match memory_id {
                    Some(id) => RecoveryContext::for_memory(operation, id),
                    None => RecoveryContext::new(operation),
                };
                let mut options =
                    RecoveryOptions::default().with_retry(move || self.embed_one(text).boxed());
                if let Some(cached) = self.embedding_cache.get(&key) {
                    options = options.with_fallback(cached.value().clone());
                }
                let recovered = self.recovery.handle(error, &context, options).await;
                if let Some(warning) = &recovered.warning {
                    warn!(context = %context, %warning, "embedding recovered");
                }
                recovered.into_result()?
            }
        };
        self.embedding_cache.insert(key, embedding.clone());
        Ok(embedding)
    }

    async fn represent(
        &self,
        id: &str,
        content: &str,
        supplied: Option<&Context>,
        context_type: ContextType,
        operation: &str,
    ) -> Result<Representation, RecallError> {
        let analysis = self.analyzer.analyze(content, self.clock.now());

        let metadata = match supplied.map(|c| (validate_metadata(&c.metadata), &c.metadata)) {
            None => analysis.metadata,
            Some((Ok(()), metadata)) => metadata.clone(),
            Some((Err(error), _)) => {
                let context = RecoveryContext::for_memory(operation, id);
                let options = RecoveryOptions::default().with_fallback(analysis.metadata);
                self.recovery.handle(error, &context, options).await.into_result()?
            }
        };
        let summary = supplied
            .map(|c| c.summary.clone())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(analysis.summary);

        let reusable = supplied
            .filter(|c| c.content == content && !c.embedding.is_empty())
            .map(|c| c.embedding.clone());
        let embedding = match reusable {
            Some(embedding) => embedding,
            None => self.generate_embedding(content, operation, Some(id)).await?,
        };
        let embedding = if embedding.is_empty() {
            let error = RecallError::RepresentationGeneration {
                memory_id: id.to_string(),
                reason: format!("model `{}` returned an empty vector", embedding.model),
            };
            let context = RecoveryContext::for_memory(operation, id);
            let options = RecoveryOptions::default().with_retry(move || {
                async move {
                    let retried = self.embed_one(content).await?;
                    if retried.is_empty() {
                        return Err(RecallError::RepresentationGeneration {
                            memory_id: id.to_string(),
                            reason: "embedding still empty after retry".to_string(),
                        });
                    }
                    Ok(retried)
                }
                .boxed()
            });
            self.recovery.handle(error, &context, options).await.into_result()?
        } else {
            embedding
        };

        let context = Context {
            content: content.to_string(),
            embedding,
            metadata,
            summary,
            context_type,
        };
        let normalized = extract_metadata(&context);
        let fingerprint = generate_fingerprint(&context);
        Ok(Representation {
            embedding: context.embedding,
            metadata: context.metadata,
            normalized,
            summary: context.summary,
            fingerprint,
            context_type,
        })
    }

    /// Configured threshold for `context_type`, or its built-in default when
    /// the configured value is unusable.
    async fn threshold(&self, context_type: ContextType) -> Result<f64, RecallError> {
        let configured = self.activation.threshold_for(context_type);
        if configured.is_finite() && (0.0..=1.0).contains(&configured) {
            return Ok(configured);
        }
        let error = RecallError::InvalidThreshold {
            context_type: context_type.to_string(),
            threshold: configured,
        };
        let context = RecoveryContext::new("threshold");
        let options = RecoveryOptions::default()
            .with_fallback(ActivationConfig::default_threshold_for(context_type));
        self.recovery.handle(error, &context, options).await.into_result()
    }

    fn margin(&self) -> f64 {
        let margin = self.activation.deferred_margin;
        if margin.is_finite() && margin > 0.0 {
            margin
        } else {
            0.0
        }
    }

    fn weights(&self, context_type: ContextType) -> ScoringWeights {
        self.weights
            .override_for(context_type)
            .map(ScoringWeights::from)
            .unwrap_or_else(|| weights_for(context_type))
    }

    async fn score_all(&self, query: &Context) -> Result<Vec<Scored>, RecallError> {
        let memories: Vec<Arc<Memory>> = self
            .slots
            .iter()
            .map(|entry| entry.value().current.load_full())
            .collect();
        let query_normalized = extract_metadata(query);
        let weights = self.weights(query.context_type);
        let now = self.clock.now();

        let mut scored = Vec::with_capacity(memories.len());
        for memory in memories {
            let scores = self.similarity(&memory, query, &query_normalized, now).await?;
            let activation = compute_activation_score(&scores, &weights);
            scored.push(Scored {
                memory,
                scores,
                weights,
                activation,
            });
        }

        if !scored.is_empty() {
            let average = scored.iter().map(|s| s.activation).sum::<f64>() / scored.len() as f64;
            self.last_average.store(Some(Arc::new(average)));
        }
        metrics::counter!("recall_candidates_scored_total").increment(scored.len() as u64);
        debug!(
            scored = scored.len(),
            context_type = %query.context_type,
            "scored memories"
        );
        Ok(scored)
    }

    async fn similarity(
        &self,
        memory: &Memory,
        query: &Context,
        query_normalized: &NormalizedMetadata,
        now: DateTime<Utc>,
    ) -> Result<SimilarityScores, RecallError> {
        let embedding_similarity = match &memory.embedding {
            Some(embedding) => {
                match cosine_similarity(&embedding.vector, &query.embedding.vector) {
                    Ok(similarity) => similarity,
                    Err(error) => {
                        let context = RecoveryContext::for_memory("embedding_similarity", &memory.id);
                        let fallback = truncated_cosine(&embedding.vector, &query.embedding.vector);
                        let options = RecoveryOptions::default().with_fallback(fallback);
                        self.recovery.handle(error, &context, options).await.into_result()?
                    }
                }
            }
            None => 0.0,
        };

        let metadata_similarity = match metadata_similarity(&memory.normalized, query_normalized) {
            Ok(similarity) => similarity,
            Err(error) => {
                let context = RecoveryContext::for_memory("metadata_similarity", &memory.id);
                let options = RecoveryOptions::default()
                    .with_fallback(content_overlap(&memory.content, &query.content));
                self.recovery.handle(error, &context, options).await.into_result()?
            }
        };

        Ok(SimilarityScores {
            embedding_similarity,
            metadata_similarity,
            summary_similarity: summary_similarity(&memory.summary, &query.summary),
            temporal_relevance: temporal_relevance(
                memory.last_accessed,
                now,
                self.activation.temporal_half_life_hours,
            )?,
        })
    }

    fn in_activation_order<'s>(&self, scored: &'s [Scored]) -> Vec<&'s Scored> {
        let scores: HashMap<String, f64> = scored
            .iter()
            .map(|s| (s.memory.id.clone(), s.activation))
            .collect();
        let by_id: HashMap<&str, &Scored> =
            scored.iter().map(|s| (s.memory.id.as_str(), s)).collect();
        rank_memories_by_activation(&scores)
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).copied())
            .collect()
    }

    fn index_insert(&self, fingerprint: &str, id: &str) {
        self.fingerprint_index
            .entry(fingerprint.to_string())
            .or_default()
            .insert(id.to_string());
    }

    fn index_remove(&self, fingerprint: &str, id: &str) {
        if let Some(mut ids) = self.fingerprint_index.get_mut(fingerprint) {
            ids.remove(id);
        }
        self.fingerprint_index
            .remove_if(fingerprint, |_, ids| ids.is_empty());
    }

    fn lookup_fingerprint(&self, fingerprint: &str) -> Result<Vec<Memory>, RecallError> {
        let ids: Vec<String> = self
            .fingerprint_index
            .get(fingerprint)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();

        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let memory = self
                .slots
                .get(&id)
                .map(|slot| slot.value().current.load_full())
                .ok_or_else(|| RecallError::IndexCorruption {
                    reason: format!("fingerprint {fingerprint} points at missing memory {id}"),
                })?;
            if memory.fingerprint != fingerprint {
                return Err(RecallError::IndexCorruption {
                    reason: format!(
                        "memory {id} is indexed under {fingerprint} but has fingerprint {}",
                        memory.fingerprint
                    ),
                });
            }
            found.push(Memory::clone(&memory));
        }
        Ok(found)
    }

    fn verify_index(&self) -> Result<(), RecallError> {
        for entry in self.slots.iter() {
            let memory = entry.value().current.load();
            let indexed = self
                .fingerprint_index
                .get(&memory.fingerprint)
                .is_some_and(|ids| ids.contains(&memory.id));
            if !indexed {
                return Err(RecallError::IndexCorruption {
                    reason: format!("memory {} is missing from the fingerprint index", memory.id),
                });
            }
        }
        let fingerprints: Vec<String> = self
            .fingerprint_index
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for fingerprint in fingerprints {
            self.lookup_fingerprint(&fingerprint)?;
        }
        Ok(())
    }
}

fn not_found(id: &str) -> RecallError {
    RecallError::MemoryNotFound {
        memory_id: id.to_string(),
    }
}

fn content_key(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Cosine over the shared prefix of two vectors of different lengths,
/// 0 when that is not finite either.
fn truncated_cosine(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len().min(b.len());
    cosine_similarity(&a[..len], &b[..len])
        .ok()
        .filter(|s| s.is_finite())
        .unwrap_or(0.0)
}

fn classify(score: f64, threshold: f64, margin: f64) -> (Decision, String) {
    if score >= threshold {
        (
            Decision::Retrieved,
            format!("score {score:.3} meets threshold {threshold:.3}"),
        )
    } else if score >= threshold - margin {
        (
            Decision::Deferred,
            format!("score {score:.3} within {margin:.3} below threshold {threshold:.3}"),
        )
    } else {
        (
            Decision::Skipped,
            format!("score {score:.3} below threshold {threshold:.3}"),
        )
    }
}

fn candidate(scored: &Scored, threshold: f64, margin: f64) -> Candidate {
    let (decision, _) = classify(scored.activation, threshold, margin);
    Candidate {
        memory_id: scored.memory.id.clone(),
        activation_score: scored.activation,
        relevance_type: relevance_type(&scored.scores, &scored.weights),
        summary: scored.memory.summary.clone(),
        confidence: confidence(scored.activation, threshold),
        selected: decision == Decision::Retrieved,
    }
}

/// The signal contributing most to the activation; earlier signals win ties.
fn relevance_type(scores: &SimilarityScores, weights: &ScoringWeights) -> RelevanceType {
    let w = weights.normalized();
    let unit = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
    let contributions = [
        (RelevanceType::Semantic, unit(scores.embedding_similarity) * w.embedding),
        (RelevanceType::Topical, unit(scores.metadata_similarity) * w.metadata),
        (RelevanceType::Contextual, unit(scores.summary_similarity) * w.summary),
        (RelevanceType::Temporal, unit(scores.temporal_relevance) * w.temporal),
    ];
    contributions
        .into_iter()
        .fold((RelevanceType::Semantic, f64::NEG_INFINITY), |best, (kind, value)| {
            if value > best.1 {
                (kind, value)
            } else {
                best
            }
        })
        .0
}

/// Distance of `score` from `threshold`, scaled by the room on that side.
fn confidence(score: f64, threshold: f64) -> f64 {
    let distance = if score >= threshold {
        if threshold < 1.0 {
            (score - threshold) / (1.0 - threshold)
        } else {
            1.0
        }
    } else if threshold > 0.0 {
        (threshold - score) / threshold
    } else {
        1.0
    };
    distance.clamp(0.0, 1.0)
}

fn estimate_size(memory: &Memory) -> usize {
    let metadata = &memory.metadata;
    std::mem::size_of::<Memory>()
        + memory.id.len()
        + memory.content.len()
        + memory.summary.len()
        + memory.fingerprint.len()
        + memory
            .embedding
            .as_ref()
            .map(|e| e.vector.len() * std::mem::size_of::<f32>() + e.model.len())
            .unwrap_or(0)
        + metadata.topics.iter().map(String::len).sum::<usize>()
        + metadata
            .entities
            .iter()
            .map(|e| e.name.len() + e.entity_type.len())
            .sum::<usize>()
        + metadata
            .structural_elements
            .iter()
            .map(|e| e.content.len())
            .sum::<usize>()
        + memory.normalized.concepts.iter().map(String::len).sum::<usize>()
}
