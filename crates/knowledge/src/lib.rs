//! Documentation retrieval: chunking, embedding, indexing and search.
//!
//! Build time walks a markdown corpus, embeds every paragraph and writes one
//! JSON index. Query time loads that index into a [`SearchEngine`] and ranks
//! records by cosine similarity to the embedded query.

pub mod answer;
pub mod chunker;
pub mod corpus;
pub mod embeddings;
pub mod index;
pub mod progress;
pub mod search;
pub mod types;

#[cfg(test)]
mod tests;

pub use answer::{answer_question, Answer};
pub use chunker::chunk_document;
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use index::{IndexManifest, IndexSource, IndexStats};
pub use progress::{Phase, ProgressEvent, ProgressReporter};
pub use search::{cosine_similarity, EngineStatus, SearchEngine};
pub use types::{
    BuildReport, BuildStats, Chunk, IndexedRecord, SearchResult, SkippedChunk,
};

use chrono::Utc;
use docrag_core::AppResult;
use std::path::Path;
use std::time::Instant;

/// Build an index from every markdown file under `corpus_root` and write it
/// to `output`, followed by its manifest.
///
/// Each document is chunked and its chunks embedded one at a time before the
/// next document is read. A chunk whose embedding fails is logged and left
/// out; the build carries on. Nothing is written until every document has
/// been processed.
pub async fn build_index(
    corpus_root: &Path,
    output: &Path,
    provider: &dyn EmbeddingProvider,
    progress: &ProgressReporter,
) -> AppResult<BuildReport> {
    let report = collect_records(corpus_root, provider, progress).await?;

    progress.write(report.records.len() as u64, &output.display().to_string());
    index::write_index(output, &report.records).await?;

    let manifest = IndexManifest {
        provider: provider.provider_name().to_string(),
        model: provider.model_name().to_string(),
        dimensions: report.records.first().map(|r| r.embedding.len()),
        records: report.records.len(),
        documents: report.stats.documents as usize,
        skipped: report.stats.skipped.len(),
        built_at: Utc::now(),
    };
    index::write_manifest(output, &manifest).await?;

    tracing::info!(
        "Index written to {:?} ({} records, {} skipped)",
        output,
        report.stats.records,
        report.stats.skipped.len()
    );

    Ok(report)
}

/// Chunk and embed the corpus without persisting anything.
pub async fn collect_records(
    corpus_root: &Path,
    provider: &dyn EmbeddingProvider,
    progress: &ProgressReporter,
) -> AppResult<BuildReport> {
    let start = Instant::now();
    let mut stats = BuildStats::default();
    let mut records = Vec::new();

    tracing::info!(
        "Building index from {:?} with {} model '{}'",
        corpus_root,
        provider.provider_name(),
        provider.model_name()
    );

    let paths = corpus::discover_markdown(corpus_root)?;
    stats.documents = paths.len() as u32;
    progress.discover(paths.len() as u64, &corpus_root.display().to_string());

    for (i, path) in paths.iter().enumerate() {
        let document = match corpus::read_document(corpus_root, path).await {
            Ok(document) => document,
            Err(e) => {
                let file = corpus::document_id(corpus_root, path);
                tracing::warn!("Skipping unreadable document {}: {}", file, e);
                stats.skipped.push(SkippedChunk {
                    file,
                    chunk: None,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        // The document text is dropped here; only its chunks are embedded.
        stats.bytes_read += document.content.len() as u64;
        let chunks = chunk_document(&document.file, &document.content);
        progress.chunk(i as u64 + 1, paths.len() as u64, &document.file, chunks.len());
        drop(document);

        let total = chunks.len() as u64;
        stats.chunks_total += chunks.len() as u32;

        for (j, chunk) in chunks.into_iter().enumerate() {
            progress.embed(j as u64 + 1, total, &chunk.file, chunk.position);
            embed_chunk(chunk, provider, &mut records, &mut stats).await;
        }
    }

    stats.records = records.len() as u32;
    stats.duration_secs = start.elapsed().as_secs_f64();

    Ok(BuildReport { records, stats })
}

async fn embed_chunk(
    chunk: Chunk,
    provider: &dyn EmbeddingProvider,
    records: &mut Vec<IndexedRecord>,
    stats: &mut BuildStats,
) {
    match provider.embed(&chunk.text).await {
        Ok(embedding) => {
            tracing::info!("Embedded chunk {} of {}", chunk.position, chunk.file);
            records.push(IndexedRecord::from_chunk(chunk, embedding));
        }
        Err(e) => {
            tracing::warn!(
                "Skipping chunk {} of {}: {}",
                chunk.position,
                chunk.file,
                e
            );
            stats.skipped.push(SkippedChunk {
                file: chunk.file,
                chunk: Some(chunk.position),
                reason: e.to_string(),
            });
        }
    }
}
