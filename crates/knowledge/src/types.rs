//! Index and search type definitions.

use serde::{Deserialize, Serialize};

/// A paragraph-sized chunk of one document, before embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Source document identifier
    pub file: String,

    /// 0-based ordinal within the document
    pub position: u32,

    /// Trimmed paragraph text
    pub text: String,
}

/// The persisted unit of the index.
///
/// Serialized as `{"file", "chunk", "text", "embedding"}`. `file` and `chunk`
/// default when absent so hand-built indexes with only text and vectors load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    /// Source document identifier (path relative to the corpus root)
    #[serde(default)]
    pub file: String,

    /// Chunk ordinal within the source document
    #[serde(default)]
    pub chunk: u32,

    /// Chunk text
    pub text: String,

    /// Embedding vector
    pub embedding: Vec<f32>,
}

impl IndexedRecord {
    /// Attach an embedding to a chunk.
    pub fn from_chunk(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            file: chunk.file,
            chunk: chunk.position,
            text: chunk.text,
            embedding,
        }
    }
}

/// One ranked hit from a query. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk text
    pub text: String,

    /// Cosine similarity against the query vector
    pub similarity: f32,

    /// Source document identifier
    pub file: String,

    /// Chunk ordinal within the source document
    pub chunk: u32,
}

impl SearchResult {
    pub(crate) fn from_record(record: &IndexedRecord, similarity: f32) -> Self {
        Self {
            text: record.text.clone(),
            similarity,
            file: record.file.clone(),
            chunk: record.chunk,
        }
    }
}

/// A chunk (or whole document) left out of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedChunk {
    /// Source document identifier
    pub file: String,

    /// Chunk ordinal; `None` when the whole document could not be read
    pub chunk: Option<u32>,

    /// Why it was skipped
    pub reason: String,
}

/// Statistics from an index build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildStats {
    /// Markdown documents found under the corpus root
    pub documents: u32,

    /// Chunks produced by the chunker
    pub chunks_total: u32,

    /// Records written to the index
    pub records: u32,

    /// Chunks and documents that were skipped
    pub skipped: Vec<SkippedChunk>,

    /// Total bytes read from the corpus
    pub bytes_read: u64,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Result of an index build: the records plus how the run went.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub records: Vec<IndexedRecord>,
    pub stats: BuildStats,
}
