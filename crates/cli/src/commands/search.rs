//! Search command handler.

use super::open_engine;
use clap::Args;
use docrag_core::{AppConfig, AppResult};

/// Rank indexed paragraphs against a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of results (default: index.topK from config)
    #[arg(short = 'k', long = "top-k")]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let engine = open_engine(config).await?;
        let k = self.top_k.unwrap_or(config.top_k);
        let results = engine.query(&self.query, k).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }

        if results.is_empty() {
            println!("No results.");
            return Ok(());
        }

        for (i, result) in results.iter().enumerate() {
            println!(
                "{}. [{:.4}] {} #{}",
                i + 1,
                result.similarity,
                result.file,
                result.chunk
            );
            println!("   {}", result.text.replace('\n', "\n   "));
        }

        Ok(())
    }
}
