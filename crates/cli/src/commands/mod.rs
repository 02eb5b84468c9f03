//! Command handlers for the RetailGenie CLI.
//!
//! One submodule per subcommand, plus the helpers they share.

pub mod clear;
pub mod delete;
pub mod index;
pub mod recommend;
pub mod search;
pub mod stats;

pub use clear::ClearCommand;
pub use delete::DeleteCommand;
pub use index::IndexCommand;
pub use recommend::RecommendCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;

use retailgenie_catalog::{create_provider, EmbeddingConfig, EmbeddingProvider};
use retailgenie_core::{config::AppConfig, AppResult};
use retailgenie_index::{SearchHit, VectorIndex};
use std::sync::Arc;

/// Open the index configured for this workspace.
pub(crate) fn open_index(config: &AppConfig) -> AppResult<VectorIndex> {
    let index_config = config.index_config();
    tracing::debug!(
        "Opening {} index at {:?}",
        index_config.backend,
        index_config.path
    );
    VectorIndex::open(&index_config)
}

/// Build the configured embedding provider.
pub(crate) fn embedding_provider(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let embedding_config = EmbeddingConfig::from_settings(&config.embeddings);
    tracing::debug!(
        "Embedding provider: {} (model: {}, dimensions: {})",
        embedding_config.provider,
        embedding_config.model,
        embedding_config.dimensions
    );
    create_provider(&embedding_config, config.api_key.as_deref())
}

pub(crate) fn print_json(value: &serde_json::Value) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print ranked hits, one per line.
pub(crate) fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No matching products");
        return;
    }

    for (rank, hit) in hits.iter().enumerate() {
        let metadata = &hit.record.metadata;
        println!(
            "{:>2}. [{:.4}] {} ({}){}",
            rank + 1,
            hit.score,
            metadata.name.as_deref().unwrap_or("(unnamed)"),
            metadata.category.as_deref().unwrap_or("-"),
            hit.record
                .id
                .as_deref()
                .map(|id| format!("  id={}", id))
                .unwrap_or_default()
        );
    }
}
