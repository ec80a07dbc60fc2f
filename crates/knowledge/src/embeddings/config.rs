//! Embedding configuration.

use docrag_core::config::{DEFAULT_EMBEDDING_MODEL, DEFAULT_ENDPOINT};
use docrag_core::AppConfig;
use serde::{Deserialize, Serialize};

/// Settings for the embedding client.
///
/// Indexing and querying must build their providers from the same
/// `model`; vectors from different models do not share a space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "ollama" or "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Base URL of the embedding service
    pub endpoint: String,

    /// Per-request timeout; `None` waits for the service indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Vector size produced by the mock provider
    #[serde(default = "default_mock_dimensions")]
    pub mock_dimensions: usize,
}

fn default_mock_dimensions() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: None,
            mock_dimensions: default_mock_dimensions(),
        }
    }
}

impl From<&AppConfig> for EmbeddingConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            provider: config.embedding_provider.clone(),
            model: config.embedding_model.clone(),
            endpoint: config.endpoint.clone(),
            timeout_secs: config.timeout_secs,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "nomic-embed-text");
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert!(config.timeout_secs.is_none());
    }

    #[test]
    fn test_from_app_config_threads_model_and_endpoint() {
        let app = AppConfig {
            embedding_model: "all-minilm".to_string(),
            endpoint: "http://embedder:11434".to_string(),
            timeout_secs: Some(10),
            ..Default::default()
        };

        let config = EmbeddingConfig::from(&app);
        assert_eq!(config.model, "all-minilm");
        assert_eq!(config.endpoint, "http://embedder:11434");
        assert_eq!(config.timeout_secs, Some(10));
    }
}
