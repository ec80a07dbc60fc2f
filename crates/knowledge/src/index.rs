//! JSON persistence for the index.
//!
//! The index is a single pretty-printed JSON array of `IndexedRecord`s. A
//! sidecar manifest (`<stem>.manifest.json`) records which model produced the
//! vectors; the array format itself carries no version or model field.

use crate::types::IndexedRecord;
use chrono::{DateTime, Utc};
use docrag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

const MANIFEST_SUFFIX: &str = ".manifest.json";

/// Where a persisted index lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSource {
    File(PathBuf),
    Url(String),
}

impl IndexSource {
    /// Interpret `http(s)://` locations as URLs and everything else as paths.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }

    /// Sibling location of the manifest.
    pub fn manifest(&self) -> Self {
        match self {
            Self::File(path) => Self::File(manifest_path(path)),
            Self::Url(url) => Self::Url(manifest_url(url)),
        }
    }
}

impl fmt::Display for IndexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Build metadata written next to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    /// Embedding provider used for the build
    pub provider: String,

    /// Embedding model used for the build
    pub model: String,

    /// Vector size, when the index is non-empty
    pub dimensions: Option<usize>,

    /// Records in the index
    pub records: usize,

    /// Markdown documents found
    pub documents: usize,

    /// Chunks or documents left out
    pub skipped: usize,

    /// Build completion time
    pub built_at: DateTime<Utc>,
}

/// Summary of a loaded index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub records: usize,
    pub files: usize,
    /// Dimensionality of the first record
    pub dimensions: Option<usize>,
    /// Whether every record has the same dimensionality
    pub consistent_dimensions: bool,
}

impl IndexStats {
    pub fn from_records(records: &[IndexedRecord]) -> Self {
        let dimensions = records.first().map(|r| r.embedding.len());
        let consistent_dimensions = records
            .iter()
            .all(|r| Some(r.embedding.len()) == dimensions);
        let files: HashSet<&str> = records.iter().map(|r| r.file.as_str()).collect();

        Self {
            records: records.len(),
            files: files.len(),
            dimensions,
            consistent_dimensions,
        }
    }
}

/// Path of the manifest belonging to an index file.
pub fn manifest_path(index_path: &Path) -> PathBuf {
    let name = index_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    index_path.with_file_name(manifest_name(&name))
}

/// URL of the manifest belonging to a remote index. Only the path is
/// rewritten; query and fragment are kept.
fn manifest_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            let path = manifest_name(parsed.path());
            parsed.set_path(&path);
            parsed.to_string()
        }
        Err(_) => manifest_name(url),
    }
}

fn manifest_name(name: &str) -> String {
    match name.strip_suffix(".json") {
        Some(stem) => format!("{}{}", stem, MANIFEST_SUFFIX),
        None => format!("{}{}", name, MANIFEST_SUFFIX),
    }
}

/// Write the whole index in one go, pretty-printed with 2-space indentation.
pub async fn write_index(path: &Path, records: &[IndexedRecord]) -> AppResult<()> {
    let json = serde_json::to_string_pretty(records)?;
    write_file(path, json).await?;

    tracing::debug!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}

/// Write the manifest next to the index.
pub async fn write_manifest(index_path: &Path, manifest: &IndexManifest) -> AppResult<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    write_file(&manifest_path(index_path), json).await
}

async fn write_file(path: &Path, contents: String) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::Knowledge(format!("Failed to create directory {:?}: {}", parent, e))
        })?;
    }

    tokio::fs::write(path, contents)
        .await
        .map_err(|e| AppError::Knowledge(format!("Failed to write {:?}: {}", path, e)))
}

/// Fetch and parse a persisted index. Every failure is an `IndexLoad` error.
pub async fn fetch_index(
    source: &IndexSource,
    http: &reqwest::Client,
) -> AppResult<Vec<IndexedRecord>> {
    let body = fetch_bytes(source, http).await?;
    serde_json::from_slice(&body)
        .map_err(|e| AppError::IndexLoad(format!("{} is not a valid index: {}", source, e)))
}

/// Fetch the manifest for an index, if there is one.
pub async fn fetch_manifest(
    source: &IndexSource,
    http: &reqwest::Client,
) -> AppResult<Option<IndexManifest>> {
    let manifest_source = source.manifest();

    if let IndexSource::File(path) = &manifest_source {
        if !path.exists() {
            return Ok(None);
        }
    }

    let body = match fetch_bytes(&manifest_source, http).await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("No manifest at {}: {}", manifest_source, e);
            return Ok(None);
        }
    };

    let manifest = serde_json::from_slice(&body).map_err(|e| {
        AppError::IndexLoad(format!("{} is not a valid manifest: {}", manifest_source, e))
    })?;

    Ok(Some(manifest))
}

async fn fetch_bytes(source: &IndexSource, http: &reqwest::Client) -> AppResult<Vec<u8>> {
    match source {
        IndexSource::File(path) => tokio::fs::read(path)
            .await
            .map_err(|e| AppError::IndexLoad(format!("cannot read {:?}: {}", path, e))),
        IndexSource::Url(url) => {
            let response = http
                .get(url)
                .send()
                .await
                .map_err(|e| AppError::IndexLoad(format!("request to {} failed: {}", url, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::IndexLoad(format!(
                    "{} answered with status {}",
                    url, status
                )));
            }

            let bytes = response.bytes().await.map_err(|e| {
                AppError::IndexLoad(format!("failed to read body from {}: {}", url, e))
            })?;

            Ok(bytes.to_vec())
        }
    }
}
