//! Clear command handler.

use super::open_index;
use clap::Args;
use retailgenie_core::{config::AppConfig, AppResult};

/// Remove every record from the index
#[derive(Args, Debug)]
pub struct ClearCommand {}

impl ClearCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clear command");

        let index = open_index(config)?;
        index.clear()?;

        println!("Vector index cleared ({:?})", index.path());
        Ok(())
    }
}
