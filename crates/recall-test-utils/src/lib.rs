// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Recall integration tests.
//!
//! - [`MockEmbedder`] - Embedding adapter with pinned vectors, configurable
//!   dimensions, and failure injection

pub mod mock_embedder;

pub use mock_embedder::MockEmbedder;
