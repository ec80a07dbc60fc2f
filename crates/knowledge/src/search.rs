//! Cosine-similarity search over a loaded index.

use crate::embeddings::EmbeddingProvider;
use crate::index::{fetch_index, fetch_manifest, IndexManifest, IndexSource, IndexStats};
use crate::types::{IndexedRecord, SearchResult};
use docrag_core::{AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use docrag_core::config::DEFAULT_TOP_K;

/// Cosine similarity of two vectors.
///
/// Sums run in `f64` so very small or very large components neither
/// underflow nor overflow. Returns 0.0 when either vector has zero norm, when
/// the dot product is zero, or when the lengths differ. Never NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    if dot == 0.0 {
        return 0.0;
    }

    let norm_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity as f32
    } else {
        0.0
    }
}

/// Score every record against `query` and keep the best `k`.
///
/// The sort is stable, so records with equal similarity keep index order.
pub fn rank_records(records: &[IndexedRecord], query: &[f32], k: usize) -> Vec<SearchResult> {
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = records
        .iter()
        .enumerate()
        .map(|(i, record)| (i, cosine_similarity(query, &record.embedding)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(i, similarity)| SearchResult::from_record(&records[i], similarity))
        .collect()
}

/// Snapshot of the engine for status endpoints and the CLI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub source: Option<String>,
    pub loaded: bool,
    pub error: Option<String>,
    pub provider: String,
    pub model: String,
    pub stats: IndexStats,
    pub manifest: Option<IndexManifest>,
    pub model_mismatch: bool,
}

/// Holds one loaded index and answers top-K queries against it.
///
/// Queries take `&self` and never mutate the records, so a single engine can
/// serve concurrent callers.
#[derive(Debug)]
pub struct SearchEngine {
    source: Option<IndexSource>,
    provider: Arc<dyn EmbeddingProvider>,
    http: reqwest::Client,
    records: Arc<Vec<IndexedRecord>>,
    loaded: bool,
    load_error: Option<String>,
    manifest: Option<IndexManifest>,
    model_mismatch: bool,
}

impl SearchEngine {
    /// Create an engine for an index that has not been loaded yet.
    pub fn new(source: IndexSource, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            source: Some(source),
            provider,
            http: reqwest::Client::new(),
            records: Arc::new(Vec::new()),
            loaded: false,
            load_error: None,
            manifest: None,
            model_mismatch: false,
        }
    }

    /// Create an engine over records already in memory.
    pub fn from_records(records: Vec<IndexedRecord>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            source: None,
            provider,
            http: reqwest::Client::new(),
            records: Arc::new(records),
            loaded: true,
            load_error: None,
            manifest: None,
            model_mismatch: false,
        }
    }

    /// Use a preconfigured HTTP client for remote indexes.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// A new, not yet loaded engine over the same source, provider and HTTP
    /// client. `None` for engines built from in-memory records.
    ///
    /// Lets a caller load a replacement index while this engine keeps
    /// answering queries.
    pub fn unloaded(&self) -> Option<Self> {
        let source = self.source.clone()?;
        Some(Self::new(source, Arc::clone(&self.provider)).with_http_client(self.http.clone()))
    }

    /// Fetch and parse the index.
    ///
    /// On failure the engine is left empty with the error retained, and every
    /// query returns no results until a later load succeeds. Loading twice
    /// from an unchanged source yields the same records.
    pub async fn load(&mut self) -> AppResult<()> {
        let source = self.source.clone().ok_or_else(|| {
            AppError::IndexLoad("engine was built from in-memory records".to_string())
        })?;

        match fetch_index(&source, &self.http).await {
            Ok(records) => {
                let stats = IndexStats::from_records(&records);
                if !stats.consistent_dimensions {
                    warn!("Index {} mixes vector dimensions", source);
                }

                self.manifest = fetch_manifest(&source, &self.http).await.unwrap_or_else(|e| {
                    warn!("Ignoring unreadable manifest for {}: {}", source, e);
                    None
                });
                self.model_mismatch = match &self.manifest {
                    Some(m) if m.model != self.provider.model_name() => {
                        warn!(
                            "Index {} was built with model '{}' but queries use '{}'",
                            source,
                            m.model,
                            self.provider.model_name()
                        );
                        true
                    }
                    _ => false,
                };

                info!("Loaded {} records from {}", records.len(), source);

                self.records = Arc::new(records);
                self.loaded = true;
                self.load_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load index {}: {}", source, e);

                self.records = Arc::new(Vec::new());
                self.loaded = false;
                self.load_error = Some(e.to_string());
                self.manifest = None;
                self.model_mismatch = false;
                Err(e)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Message of the last failed load, if the engine is in the failed state.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source(&self) -> Option<&IndexSource> {
        self.source.as_ref()
    }

    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.manifest.as_ref()
    }

    /// Whether the manifest names a different model from the query provider.
    pub fn model_mismatch(&self) -> bool {
        self.model_mismatch
    }

    /// Embed `text` and return up to `k` records in descending similarity.
    ///
    /// An empty or failed index yields `[]` without contacting the
    /// embedding service. Embedding failures propagate.
    pub async fn query(&self, text: &str, k: usize) -> AppResult<Vec<SearchResult>> {
        if self.records.is_empty() || k == 0 {
            debug!("Query on empty index or k=0, returning no results");
            return Ok(Vec::new());
        }

        let records = Arc::clone(&self.records);
        let query_vector = self.provider.embed(text).await?;

        if let Some(first) = records.first() {
            if first.embedding.len() != query_vector.len() {
                warn!(
                    "Query vector has {} dimensions but the index has {}",
                    query_vector.len(),
                    first.embedding.len()
                );
            }
        }

        Ok(rank_records(&records, &query_vector, k))
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats::from_records(&self.records)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            source: self.source.as_ref().map(|s| s.to_string()),
            loaded: self.loaded,
            error: self.load_error.clone(),
            provider: self.provider.provider_name().to_string(),
            model: self.provider.model_name().to_string(),
            stats: self.stats(),
            manifest: self.manifest.clone(),
            model_mismatch: self.model_mismatch,
        }
    }
}
