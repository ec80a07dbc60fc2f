//! Stats command handler.

use super::open_engine;
use clap::Args;
use docrag_core::{AppConfig, AppResult};

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

        let engine = open_engine(config).await?;
        let status = engine.status();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        let stats = &status.stats;
        println!("Index:      {}", status.source.as_deref().unwrap_or("-"));
        println!("Records:    {}", stats.records);
        println!("Files:      {}", stats.files);
        match stats.dimensions {
            Some(d) if stats.consistent_dimensions => println!("Dimensions: {}", d),
            Some(d) => println!("Dimensions: {} (mixed)", d),
            None => println!("Dimensions: -"),
        }

        if let Some(manifest) = &status.manifest {
            println!(
                "Built:      {} with {} '{}' ({} skipped)",
                manifest.built_at.to_rfc3339(),
                manifest.provider,
                manifest.model,
                manifest.skipped
            );
        }

        if status.model_mismatch {
            println!(
                "Warning: queries use model '{}', which differs from the build model",
                status.model
            );
        }

        Ok(())
    }
}
