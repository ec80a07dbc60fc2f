//! Index command handler.

use clap::Args;
use docrag_core::{AppConfig, AppResult};
use docrag_knowledge::{
    build_index, create_provider, EmbeddingConfig, ProgressEvent, ProgressReporter,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Chunk and embed the corpus, then write the index
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Corpus root (default: index.corpus from config, or ./docs)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Output file (default: the configured index path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print a line per build step to stderr
    #[arg(long)]
    pub progress: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let corpus = self.corpus.clone().unwrap_or_else(|| config.corpus_path());
        let output = self.output.clone().unwrap_or_else(|| config.index_file());

        tracing::info!("Executing index command: {:?} -> {:?}", corpus, output);

        let provider = create_provider(&EmbeddingConfig::from(config))?;
        let progress = if self.progress {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event.format_simple())
            }))
        } else {
            ProgressReporter::noop()
        };

        let report = build_index(&corpus, &output, provider.as_ref(), &progress).await?;
        let stats = &report.stats;

        if self.json {
            let out = serde_json::json!({
                "output": output,
                "model": provider.model_name(),
                "documents": stats.documents,
                "chunksTotal": stats.chunks_total,
                "records": stats.records,
                "skipped": stats.skipped,
                "bytesRead": stats.bytes_read,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!(
                "Indexed {} documents: {} of {} chunks embedded in {:.2}s",
                stats.documents, stats.records, stats.chunks_total, stats.duration_secs
            );
            for skipped in &stats.skipped {
                match skipped.chunk {
                    Some(chunk) => {
                        println!("  skipped {} #{}: {}", skipped.file, chunk, skipped.reason)
                    }
                    None => println!("  skipped {}: {}", skipped.file, skipped.reason),
                }
            }
            println!("Wrote {}", output.display());
        }

        Ok(())
    }
}
