// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading a memories file into a fresh store.

use std::path::Path;

use recall_config::RecallConfig;
use recall_core::RecallError;
use recall_memory::MemoryStore;
use tracing::{debug, info};

/// Build a store from `config` and fill it from `path`, one memory per
/// non-blank line. Lines starting with `#` are comments.
pub async fn load_store(config: &RecallConfig, path: &Path) -> Result<MemoryStore, RecallError> {
    let store = MemoryStore::from_config(config)?;
    let loaded = load_into(&store, path).await?;
    info!(path = %path.display(), loaded, "loaded memories");
    Ok(store)
}

/// Store every memory line of `path` in `store`. Returns the number stored.
pub async fn load_into(store: &MemoryStore, path: &Path) -> Result<usize, RecallError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        RecallError::InvalidConfiguration {
            key: "memories".to_string(),
            reason: format!("cannot read {}: {e}", path.display()),
        }
    })?;

    let mut stored = 0;
    for (line_no, line) in memory_lines(&content) {
        let id = store.store_memory(line, None).await?;
        debug!(line = line_no, memory_id = %id, "stored line");
        stored += 1;
    }
    Ok(stored)
}

/// Non-blank, non-comment lines with their 1-based line numbers.
fn memory_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}
