//! Paragraph chunking for markdown documents.

use crate::types::Chunk;
use once_cell::sync::Lazy;
use regex::Regex;

/// Paragraphs must be longer than this many characters (after trimming).
pub const MIN_CHUNK_CHARS: usize = 30;

/// A newline, any whitespace (including further newlines), and a newline.
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("Invalid paragraph break pattern"));

/// Split a document into paragraph chunks.
///
/// Candidates are separated by blank lines, trimmed, and dropped when their
/// length is `MIN_CHUNK_CHARS` or less. Survivors are numbered from 0 in
/// document order. A document with no qualifying paragraph yields no chunks.
pub fn chunk_document(file: &str, text: &str) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| p.chars().count() > MIN_CHUNK_CHARS)
        .enumerate()
        .map(|(position, p)| Chunk {
            file: file.to_string(),
            position: position as u32,
            text: p.to_string(),
        })
        .collect();

    tracing::debug!("Chunked {} into {} paragraphs", file, chunks.len());

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_A: &str = "Vue components are reusable instances with a name.";
    const LONG_B: &str = "The template syntax binds the rendered DOM to data.";

    #[test]
    fn test_splits_on_blank_lines() {
        let text = format!("{}\n\n{}\n", LONG_A, LONG_B);
        let chunks = chunk_document("guide.md", &text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, LONG_A);
        assert_eq!(chunks[1].text, LONG_B);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
        assert!(chunks.iter().all(|c| c.file == "guide.md"));
    }

    #[test]
    fn test_whitespace_only_lines_separate_paragraphs() {
        let text = format!("{}\n   \t\n\n  \n{}", LONG_A, LONG_B);
        let chunks = chunk_document("guide.md", &text);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = format!("{}\r\n\r\n{}\r\n", LONG_A, LONG_B);
        let chunks = chunk_document("guide.md", &text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, LONG_A);
    }

    #[test]
    fn test_single_newline_keeps_paragraph_together() {
        let text = format!("{}\n{}", LONG_A, LONG_B);
        let chunks = chunk_document("guide.md", &text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, format!("{}\n{}", LONG_A, LONG_B));
    }

    #[test]
    fn test_short_paragraphs_are_dropped_and_ordinals_stay_contiguous() {
        let text = format!("# Title\n\n{}\n\nSee also.\n\n{}", LONG_A, LONG_B);
        let chunks = chunk_document("guide.md", &text);

        assert_eq!(chunks.len(), 2);
        let positions: Vec<u32> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert!(chunks
            .iter()
            .all(|c| c.text.trim().chars().count() > MIN_CHUNK_CHARS));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let exactly = "a".repeat(MIN_CHUNK_CHARS);
        let one_more = "b".repeat(MIN_CHUNK_CHARS + 1);
        let text = format!("{}\n\n{}", exactly, one_more);

        let chunks = chunk_document("edge.md", &text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, one_more);
    }

    #[test]
    fn test_threshold_counts_characters_not_bytes() {
        // 20 characters, 40 bytes
        let text = "é".repeat(20);
        assert!(chunk_document("accents.md", &text).is_empty());
    }

    #[test]
    fn test_short_document_yields_nothing() {
        assert!(chunk_document("tiny.md", "ten chars!").is_empty());
    }

    #[test]
    fn test_empty_document() {
        assert!(chunk_document("empty.md", "").is_empty());
        assert!(chunk_document("blank.md", "\n\n   \n").is_empty());
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let text = format!("\n\n    {}    \n\n", LONG_A);
        let chunks = chunk_document("guide.md", &text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, LONG_A);
    }
}
