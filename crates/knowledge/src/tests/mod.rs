//! Shared test fixtures.


use crate::embeddings::EmbeddingProvider;
use docrag_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider backed by a fixed text → vector table.
///
/// Texts missing from the table fail with `EmbeddingUnavailable`, which lets
/// tests simulate a flaky service for particular chunks.
#[derive(Debug, Default)]
pub(crate) struct StaticProvider {
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub(crate) fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for StaticProvider {
    fn provider_name(&self) -> &str {
        "static"
    }

    fn model_name(&self) -> &str {
        "static-v1"
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| AppError::EmbeddingUnavailable(format!("no vector for '{}'", text)))
    }
}
