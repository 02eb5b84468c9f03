//! Stats command handler.

use super::{open_index, print_json};
use clap::Args;
use retailgenie_core::{config::AppConfig, AppResult};

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let stats = open_index(config)?.stats()?;

        if self.json {
            print_json(&serde_json::to_value(&stats)?)?;
        } else {
            let dimensions: Vec<String> = stats.dimensions.iter().map(|d| d.to_string()).collect();
            println!("Backend:    {}", stats.backend);
            println!("Path:       {}", stats.path.display());
            println!("Records:    {}", stats.records);
            println!(
                "Dimensions: {}",
                if dimensions.is_empty() {
                    "-".to_string()
                } else {
                    dimensions.join(", ")
                }
            );
            println!("Size:       {} bytes", stats.size_bytes);
            if let Some(modified) = stats.modified_at {
                println!("Modified:   {}", modified.to_rfc3339());
            }
        }

        Ok(())
    }
}
