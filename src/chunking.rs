use crate::document::Document;
use anyhow::{Context, Result};
use text_splitter::{ChunkConfig, TextSplitter};

/// Default chunk capacity in characters
pub const DEFAULT_CHUNK_SIZE: usize = 400;
/// Default overlap between neighbouring chunks in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Represents a text chunk with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// The actual text content of this chunk
    pub text: String,
    /// Estimated token count for this chunk
    pub token_count: usize,
    /// Identifier of the document this chunk belongs to
    pub document_id: String,
    /// Byte offset of this chunk in the original document
    pub start_position: usize,
}

/// Fixed-size splitter with overlap between consecutive chunks.
///
/// Boundaries are chosen at the coarsest semantic level that fits the
/// capacity (paragraphs, then lines, sentences, words, characters).
pub struct Splitter {
    splitter: TextSplitter<text_splitter::Characters>,
}

impl Splitter {
    /// Create a splitter; `chunk_overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .with_context(|| {
                format!(
                    "Invalid chunking configuration: overlap {} with chunk size {}",
                    chunk_overlap, chunk_size
                )
            })?
            .with_trim(true);

        Ok(Splitter {
            splitter: TextSplitter::new(config),
        })
    }

    /// Split a single text into chunks tagged with `document_id`
    pub fn split_text(&self, text: &str, document_id: &str) -> Vec<TextChunk> {
        self.splitter
            .chunk_indices(text)
            .filter(|(_, chunk)| !chunk.trim().is_empty())
            .map(|(start_position, chunk)| TextChunk {
                text: chunk.to_string(),
                token_count: estimate_token_count(chunk),
                document_id: document_id.to_string(),
                start_position,
            })
            .collect()
    }

    /// Split a loaded document
    pub fn split(&self, document: &Document) -> Vec<TextChunk> {
        self.split_text(&document.content, &document.document_id)
    }
}

/// Calculate approximate token count for a text
/// This is a very simple estimation - words plus punctuation
pub fn estimate_token_count(text: &str) -> usize {
    let words = text.split_whitespace().count();
    let punctuation = text.chars().filter(|c| c.is_ascii_punctuation()).count();
    words + punctuation
}
