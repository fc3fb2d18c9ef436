// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding adapter for deterministic testing.
//!
//! Texts without a pinned vector get a cheap character-histogram embedding,
//! so similar strings still land close to each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use recall_core::traits::{EmbeddingAdapter, PluginAdapter};
use recall_core::types::{EmbeddingInput, EmbeddingOutput, HealthStatus};
use recall_core::RecallError;

/// Name reported as the model for every output.
pub const MOCK_MODEL: &str = "mock-embedder";

/// An embedding adapter with scripted behaviour.
pub struct MockEmbedder {
    dimensions: usize,
    output_dimensions: Option<usize>,
    pinned: Mutex<HashMap<String, Vec<f32>>>,
    fail_first: AtomicUsize,
    always_fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    /// Create a mock producing vectors of `dimensions` length.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            output_dimensions: None,
            pinned: Mutex::new(HashMap::new()),
            fail_first: AtomicUsize::new(0),
            always_fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the first `n` calls with `EmbeddingGeneration`, then succeed.
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    /// Fail every call.
    pub fn always_failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Sleep for `delay` inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Produce vectors of `actual` length while still reporting the
    /// configured dimensions.
    pub fn with_output_dimensions(mut self, actual: usize) -> Self {
        self.output_dimensions = Some(actual);
        self
    }

    /// Return `vector` (verbatim, regardless of `dimensions`) for `text`.
    pub async fn pin(&self, text: &str, vector: Vec<f32>) {
        self.pinned.lock().await.insert(text.to_string(), vector);
    }

    /// Number of `embed` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn histogram(&self, text: &str) -> Vec<f32> {
        let len = self.output_dimensions.unwrap_or(self.dimensions).max(1);
        let mut vector = vec![0.0_f32; len];
        for c in text.to_lowercase().chars().filter(|c| c.is_alphanumeric()) {
            let slot = (c as usize) % vector.len();
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }

    fn should_fail(&self) -> bool {
        if self.always_fail {
            return true;
        }
        self.fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        MOCK_MODEL
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        if self.always_fail {
            Ok(HealthStatus::Unhealthy("configured to fail".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, RecallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail() {
            return Err(RecallError::EmbeddingGeneration {
                model: MOCK_MODEL.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let pinned = self.pinned.lock().await;
        let embeddings: Vec<Vec<f32>> = input
            .texts
            .iter()
            .map(|text| {
                pinned
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| self.histogram(text))
            })
            .collect();
        let dimensions = embeddings.first().map(Vec::len).unwrap_or(self.dimensions);

        Ok(EmbeddingOutput {
            embeddings,
            model: MOCK_MODEL.to_string(),
            dimensions,
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
