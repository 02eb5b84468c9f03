//! Recommend command handler.
//!
//! Looks the product up in a products file, then asks the index for similar
//! products in the same category.

use super::{embedding_provider, open_index, print_hits, print_json};
use clap::Args;
use retailgenie_catalog::{find_product, load_products, recommend};
use retailgenie_core::{config::AppConfig, AppError, AppResult};
use std::path::PathBuf;

/// Recommend products similar to a given product
#[derive(Args, Debug)]
pub struct RecommendCommand {
    /// Products JSON file containing the product
    #[arg(short, long, default_value = "data/sample_products.json")]
    pub file: PathBuf,

    /// Product id (matched against id, _id or sku)
    #[arg(short, long)]
    pub product_id: String,

    /// Number of recommendations
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RecommendCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing recommend command for '{}'", self.product_id);

        let file = if self.file.is_absolute() {
            self.file.clone()
        } else {
            config.workspace.join(&self.file)
        };

        let products = load_products(&file)?;
        let product = find_product(&products, &self.product_id).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Product '{}' not found in {:?}",
                self.product_id, file
            ))
        })?;

        let provider = embedding_provider(config)?;
        let index = open_index(config)?;
        let hits = recommend(&index, provider.as_ref(), product, self.top_k).await?;

        if self.json {
            print_json(&serde_json::json!({
                "product_id": self.product_id,
                "category": product.category_or_default(),
                "recommendations": hits,
            }))?;
        } else {
            println!(
                "Recommendations for {} ({}):",
                product.name.as_deref().unwrap_or(&self.product_id),
                product.category_or_default()
            );
            print_hits(&hits);
        }

        Ok(())
    }
}
