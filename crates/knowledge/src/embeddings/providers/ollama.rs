//! Ollama embedding provider.
//!
//! Talks to `POST {endpoint}/api/embeddings` with `{"model", "prompt"}` and
//! expects `{"embedding": [..]}` back. One request per call; failures are
//! classified and returned, never retried.

use crate::embeddings::provider::validate_vector;
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use docrag_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Ollama API path for single-prompt embeddings
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// HTTP client for API requests
    client: Client,
    /// Ollama API base URL
    base_url: String,
    /// Model name (e.g., "nomic-embed-text")
    model: String,
}

/// Request payload for the embeddings API
#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from the embeddings API
#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Error body from the Ollama API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider from configuration.
    ///
    /// Does not contact the service; the first `embed` call does.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url, EMBEDDING_ENDPOINT)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = self.url();
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::EmbeddingUnavailable(format!("request to {} failed: {}", url, e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::EmbeddingUnavailable(format!("failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(AppError::EmbeddingUnavailable(format!(
                "Ollama API error ({}): {}",
                status, detail
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::EmbeddingMalformed(format!("invalid response body: {}", e))
        })?;

        let embedding = parsed.embedding.ok_or_else(|| {
            AppError::EmbeddingMalformed("response has no 'embedding' field".to_string())
        })?;

        let embedding = validate_vector(embedding)?;

        debug!("Received {} dimensional embedding", embedding.len());

        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider_for(server: &MockServer) -> OllamaProvider {
        OllamaProvider::new(&EmbeddingConfig {
            endpoint: server.base_url(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_embed_sends_model_and_prompt() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embeddings")
                    .json_body(json!({"model": "nomic-embed-text", "prompt": "hello world"}));
                then.status(200)
                    .json_body(json!({"embedding": [0.25, -0.5, 1.0]}));
            })
            .await;

        let provider = provider_for(&server);
        let embedding = provider.embed("hello world").await.unwrap();

        mock.assert_async().await;
        assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_trailing_slash_in_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200).json_body(json!({"embedding": [1.0]}));
            })
            .await;

        let provider = OllamaProvider::new(&EmbeddingConfig {
            endpoint: format!("{}/", server.base_url()),
            ..Default::default()
        })
        .unwrap();

        provider.embed("text").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(404)
                    .json_body(json!({"error": "model 'nomic-embed-text' not found"}));
            })
            .await;

        let err = provider_for(&server).embed("text").await.unwrap_err();
        match err {
            AppError::EmbeddingUnavailable(msg) => assert!(msg.contains("not found")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(500).body("boom");
            })
            .await;

        let err = provider_for(&server).embed("text").await.unwrap_err();
        assert!(matches!(err, AppError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_embedding_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200).json_body(json!({"embeddings": [[1.0, 2.0]]}));
            })
            .await;

        let err = provider_for(&server).embed("text").await.unwrap_err();
        assert!(matches!(err, AppError::EmbeddingMalformed(_)));
    }

    #[tokio::test]
    async fn test_empty_embedding_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200).json_body(json!({"embedding": []}));
            })
            .await;

        let err = provider_for(&server).embed("text").await.unwrap_err();
        assert!(matches!(err, AppError::EmbeddingMalformed(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200).body("<html>proxy page</html>");
            })
            .await;

        let err = provider_for(&server).embed("text").await.unwrap_err();
        assert!(matches!(err, AppError::EmbeddingMalformed(_)));
    }

    #[tokio::test]
    async fn test_non_numeric_values_are_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200).json_body(json!({"embedding": [0.1, "x", null]}));
            })
            .await;

        let err = provider_for(&server).embed("text").await.unwrap_err();
        assert!(matches!(err, AppError::EmbeddingMalformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let provider = OllamaProvider::new(&EmbeddingConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout_secs: Some(5),
            ..Default::default()
        })
        .unwrap();

        let err = provider.embed("text").await.unwrap_err();
        assert!(matches!(err, AppError::EmbeddingUnavailable(_)));
    }
}
