//! Markdown corpus discovery and document loading.

use docrag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name suffix that marks a document.
pub const MARKDOWN_SUFFIX: &str = ".md";

/// A document read from the corpus. Dropped once chunked.
#[derive(Debug, Clone)]
pub struct Document {
    /// Identifier stored in the index (path relative to the corpus root)
    pub file: String,

    /// Absolute or workspace-relative path on disk
    pub path: PathBuf,

    /// Raw text content
    pub content: String,
}

/// Check whether a path names a markdown document.
pub fn is_markdown(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(MARKDOWN_SUFFIX))
        .unwrap_or(false)
}

/// Recursively list every markdown file under `root`.
///
/// Directories are always descended into; entries are visited depth-first in
/// file-name order so repeated builds produce the same record order. Entries
/// that cannot be read (permissions, dangling or looping symlinks) are logged
/// and skipped.
pub fn discover_markdown(root: &Path) -> AppResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(AppError::Knowledge(format!(
            "Corpus directory does not exist: {:?}",
            root
        )));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable corpus entry: {}", e);
                continue;
            }
        };

        if entry.file_type().is_file() && is_markdown(entry.path()) {
            files.push(entry.into_path());
        }
    }

    tracing::debug!("Discovered {} markdown files under {:?}", files.len(), root);

    Ok(files)
}

/// Identifier for a document: its path relative to the corpus root, with `/`
/// separators regardless of platform.
pub fn document_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read a document. Invalid UTF-8 sequences are replaced, not rejected.
pub async fn read_document(root: &Path, path: &Path) -> AppResult<Document> {
    let bytes = tokio::fs::read(path).await?;

    Ok(Document {
        file: document_id(root, path),
        path: path.to_path_buf(),
        content: String::from_utf8_lossy(&bytes).into_owned(),
    })
}
