//! Error types for docrag.
//!
//! A single error enum covers configuration, I/O, embedding, index loading,
//! generation and proxy failures. Skipped chunks during indexing are not
//! errors; they are reported in the build report and logged.

use thiserror::Error;

/// Unified error type for docrag.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The embedding service could not be reached or answered with a
    /// non-success status
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The embedding service answered, but without a usable vector
    #[error("Malformed embedding response: {0}")]
    EmbeddingMalformed(String),

    /// The persisted index is missing, unreachable or corrupt
    #[error("Failed to load index: {0}")]
    IndexLoad(String),

    /// Corpus walking, chunking and index building errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Text generation errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Query-time proxy errors
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether this error came from the embedding service boundary.
    pub fn is_embedding_error(&self) -> bool {
        matches!(
            self,
            AppError::EmbeddingUnavailable(_) | AppError::EmbeddingMalformed(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
