//! Delete command handler.

use super::{open_index, print_json};
use clap::Args;
use retailgenie_core::{config::AppConfig, AppResult};

/// Delete one record by key
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Record key (SHA-256 of the record text)
    pub key: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing delete command for key {}", self.key);

        let index = open_index(config)?;
        let deleted = index.delete(&self.key)?;

        if self.json {
            print_json(&serde_json::json!({
                "key": self.key,
                "deleted": deleted,
            }))?;
        } else if deleted {
            println!("Deleted {}", self.key);
        } else {
            println!("No record with key {}", self.key);
        }

        Ok(())
    }
}
