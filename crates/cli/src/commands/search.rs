//! Search command handler.

use super::{embedding_provider, open_index, print_hits, print_json};
use clap::Args;
use retailgenie_catalog::semantic_search;
use retailgenie_core::{config::AppConfig, AppResult};

/// Semantic product search
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of results to return
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Only return products in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");
        tracing::debug!("Search options: {:?}", self);

        let provider = embedding_provider(config)?;
        let index = open_index(config)?;

        let hits = semantic_search(
            &index,
            provider.as_ref(),
            &self.query,
            self.top_k,
            self.category.as_deref(),
        )
        .await?;

        if self.json {
            print_json(&serde_json::json!({
                "query": self.query,
                "category": self.category,
                "results": hits,
            }))?;
        } else {
            print_hits(&hits);
        }

        Ok(())
    }
}
