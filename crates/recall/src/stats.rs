// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `recall stats` command implementation.

use std::path::Path;

use recall_config::RecallConfig;
use recall_core::{HealthStatus, RecallError};
use recall_memory::{MemoryStore, SystemStats};
use serde::Serialize;

use crate::corpus;

/// Structured output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: SystemStats,
    pub health: String,
    pub embedding_dimensions: usize,
}

/// Run `recall stats`, optionally after loading a memories file.
pub async fn run_stats(
    config: &RecallConfig,
    memories: Option<&Path>,
    json: bool,
) -> Result<(), RecallError> {
    let store = match memories {
        Some(path) => corpus::load_store(config, path).await?,
        None => MemoryStore::from_config(config)?,
    };
    let response = StatsResponse {
        stats: store.get_system_stats(),
        health: describe_health(&store.health_check().await?),
        embedding_dimensions: config.store.embedding_dimensions,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_stats(&response);
    }
    Ok(())
}

fn describe_health(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Degraded(reason) => format!("degraded: {reason}"),
        HealthStatus::Unhealthy(reason) => format!("unhealthy: {reason}"),
    }
}

/// Human-readable byte count.
fn format_bytes(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * KIB;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn print_stats(response: &StatsResponse) {
    let stats = &response.stats;
    println!();
    println!("  recall stats");
    println!("  {}", "-".repeat(35));
    println!("    Memories:   {}", stats.total_memories);
    println!("    Avg score:  {:.3}", stats.average_activation_score);
    println!("    Footprint:  {}", format_bytes(stats.memory_usage_estimate));
    match stats.last_cleanup {
        Some(at) => println!("    Cleanup:    {}", at.to_rfc3339()),
        None => println!("    Cleanup:    never"),
    }
    println!("    Embedder:   {} ({} dims)", response.health, response.embedding_dimensions);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn health_descriptions() {
        assert_eq!(describe_health(&HealthStatus::Healthy), "healthy");
        assert_eq!(
            describe_health(&HealthStatus::Degraded("index".into())),
            "degraded: index"
        );
    }

    #[tokio::test]
    async fn empty_store_stats_serialize_flat() {
        let store = MemoryStore::from_config(&RecallConfig::default()).unwrap();
        let response = StatsResponse {
            stats: store.get_system_stats(),
            health: describe_health(&store.health_check().await.unwrap()),
            embedding_dimensions: 384,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["total_memories"], 0);
        assert_eq!(json["health"], "healthy");
        assert!(json["last_cleanup"].is_null());
    }
}
