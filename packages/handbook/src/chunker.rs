//! Fixed-size, overlapping character splitter.
//!
//! Windows are at most `chunk_size` characters and share at most
//! `chunk_overlap` characters with their predecessor. Breaks prefer
//! whitespace so words are not cut when avoidable. Spans are recorded in
//! characters, so `content == parent[span]` always holds.

use std::ops::Range;

use crate::types::config::ChunkConfig;
use crate::types::document::{Chunk, Document, DocumentKind};

/// Splits documents into chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Split one document. Blank documents produce nothing.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        if doc.content.trim().is_empty() {
            return Vec::new();
        }

        let spans = split_spans(&doc.content, self.config);
        let bytes = char_byte_offsets(&doc.content);

        spans
            .into_iter()
            .map(|span| {
                let content = doc.content[bytes[span.start]..bytes[span.end]].to_string();
                let mut metadata = doc.metadata.clone();
                match doc.metadata.kind {
                    DocumentKind::Html => metadata.start_offset = Some(span.start),
                    DocumentKind::Pdf => metadata.start_offset = None,
                }
                Chunk {
                    content,
                    metadata,
                    span,
                }
            })
            .collect()
    }

    /// Split many documents, preserving order.
    pub fn split_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.split_document(d)).collect()
    }
}

/// Byte offset of every char boundary, including the end.
fn char_byte_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Compute character spans for `text`.
pub fn split_spans(text: &str, config: ChunkConfig) -> Vec<Range<usize>> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(size - 1);

    let mut spans = Vec::new();
    let mut start = 0;

    while start < len {
        if len - start <= size {
            spans.push(start..len);
            break;
        }

        // End after the last whitespace that still leaves progress.
        let hard_end = start + size;
        let end = (start + overlap + 1..=hard_end)
            .rev()
            .find(|&p| chars[p - 1].is_whitespace())
            .unwrap_or(hard_end);
        spans.push(start..end);

        // Next window starts on a word boundary inside the overlap region.
        let floor = end - overlap;
        start = (floor..end)
            .find(|&q| q > 0 && chars[q - 1].is_whitespace())
            .unwrap_or(floor);
    }

    spans
}

/// Rebuild the parent text from ordered chunks by dropping each chunk's
/// overlap with its predecessor.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered: usize = 0;
    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.span.start);
        out.extend(chunk.content.chars().skip(skip));
        covered = chunk.span.end;
    }
    out
}
