// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Recall memory engine.
//!
//! Provides the error taxonomy, the context type enumeration, and the
//! adapter traits through which the engine reaches its external
//! collaborators (embedding generation).

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorCategory, RecallError};
pub use types::{ContextType, EmbeddingInput, EmbeddingOutput, HealthStatus};

pub use traits::{EmbeddingAdapter, PluginAdapter};
