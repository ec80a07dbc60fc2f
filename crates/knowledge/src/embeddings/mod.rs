//! Embedding client.
//!
//! Turns text into vectors through a configured provider. The indexer and the
//! search engine each build their provider from the same `EmbeddingConfig`.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
