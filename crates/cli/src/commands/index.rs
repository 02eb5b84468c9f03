//! Index command handler.
//!
//! Embeds a products file and upserts it into the vector index.

use super::{embedding_provider, open_index, print_json};
use clap::Args;
use retailgenie_catalog::{index_products, load_products};
use retailgenie_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

/// Index products into the local vector store
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Products JSON file (array or {"products": [...]})
    #[arg(short, long, default_value = "data/sample_products.json")]
    pub file: PathBuf,

    /// Clear the index before indexing
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command for {:?}", self.file);

        let file = if self.file.is_absolute() {
            self.file.clone()
        } else {
            config.workspace.join(&self.file)
        };

        let products = load_products(&file)?;
        let provider = embedding_provider(config)?;
        let index = open_index(config)?;

        if self.reset {
            index.clear()?;
        }

        let written = index_products(&index, provider.as_ref(), &products).await?;

        if self.json {
            print_json(&serde_json::json!({
                "file": file,
                "backend": index.backend(),
                "path": index.path(),
                "indexed": written,
                "provider": provider.provider_name(),
                "model": provider.model_name(),
            }))?;
        } else {
            println!(
                "Indexed {} items into vector store ({})",
                written,
                index.backend()
            );
        }

        Ok(())
    }
}
