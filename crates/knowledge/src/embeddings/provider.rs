//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use docrag_core::{AppError, AppResult};
use std::sync::Arc;

/// A text → vector function backed by some model.
///
/// Each `embed` call is exactly one request: implementations do not batch,
/// cache or retry.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "ollama", "mock")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Embed a single text.
    ///
    /// # Errors
    /// * `AppError::EmbeddingUnavailable` - service unreachable or non-success status
    /// * `AppError::EmbeddingMalformed` - response without a usable vector
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "ollama" => {
            let provider = super::providers::ollama::OllamaProvider::new(config)?;
            Ok(Arc::new(provider))
        }

        "mock" => {
            let provider =
                super::providers::mock::MockProvider::new(&config.model, config.mock_dimensions);
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, mock",
            config.provider
        ))),
    }
}

/// Reject vectors that cannot take part in a similarity computation.
pub(crate) fn validate_vector(embedding: Vec<f32>) -> AppResult<Vec<f32>> {
    if embedding.is_empty() {
        return Err(AppError::EmbeddingMalformed(
            "embedding vector is empty".to_string(),
        ));
    }

    if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(AppError::EmbeddingMalformed(format!(
            "embedding contains a non-finite value at index {}",
            pos
        )));
    }

    Ok(embedding)
}
