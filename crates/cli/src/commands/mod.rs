//! Command handlers for the docrag CLI.

pub mod ask;
pub mod index;
pub mod search;
pub mod serve;
pub mod stats;

pub use ask::AskCommand;
pub use index::IndexCommand;
pub use search::SearchCommand;
pub use serve::ServeCommand;
pub use stats::StatsCommand;

use docrag_core::{AppConfig, AppError, AppResult};
use docrag_knowledge::{create_provider, EmbeddingConfig, IndexSource, SearchEngine};
use std::time::Duration;

/// Where the configured index lives.
pub(crate) fn index_source(config: &AppConfig) -> IndexSource {
    match &config.index_url {
        Some(url) => IndexSource::Url(url.clone()),
        None => IndexSource::File(config.index_file()),
    }
}

/// Build a search engine for the configured index and load it.
pub(crate) async fn open_engine(config: &AppConfig) -> AppResult<SearchEngine> {
    let provider = create_provider(&EmbeddingConfig::from(config))?;
    let mut engine = SearchEngine::new(index_source(config), provider);

    if let Some(secs) = config.timeout_secs {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;
        engine = engine.with_http_client(http);
    }

    engine.load().await?;
    Ok(engine)
}
