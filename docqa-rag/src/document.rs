//! Data types for source documents, segments, chunks and retrieval results.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// The file formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Docx,
    Text,
}

impl SourceFormat {
    /// Map a file extension (without the dot, any case) to a format.
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Ok(SourceFormat::Pdf),
            "docx" => Ok(SourceFormat::Docx),
            "txt" => Ok(SourceFormat::Text),
            other => Err(RagError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    /// Detect the format of a path from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            RagError::UnsupportedFormat(format!("'{}' has no file extension", path.display()))
        })?;
        Self::from_extension(extension)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Pdf => "pdf",
            SourceFormat::Docx => "docx",
            SourceFormat::Text => "txt",
        };
        f.write_str(name)
    }
}

/// Raw document bytes together with the declared format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    name: String,
    format: SourceFormat,
    bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn from_bytes(name: impl Into<String>, format: SourceFormat, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), format, bytes }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Where a piece of text came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocator {
    /// Name of the source document.
    pub source: String,
    /// 1-based page number, for paged formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "{} (page {page})", self.source),
            None => f.write_str(&self.source),
        }
    }
}

/// A unit of loaded text in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub content: String,
    pub metadata: SourceLocator,
}

impl Segment {
    pub fn new(content: impl Into<String>, metadata: SourceLocator) -> Self {
        Self { content: content.into(), metadata }
    }
}

/// A bounded window of segment text, ready for embedding.
///
/// Offsets and lengths are counted in characters (Unicode scalar values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: SourceLocator,
    /// Position of this chunk across the whole document, starting at 0.
    pub sequence_index: usize,
    /// Index of the segment this chunk was cut from.
    pub segment_index: usize,
    /// Character offset of the chunk start within its segment.
    pub start_char: usize,
    /// Number of leading characters repeated from the previous chunk of the same segment.
    pub overlap_chars: usize,
}

impl Chunk {
    /// The part of this chunk not already covered by its predecessor.
    pub fn fresh_content(&self) -> &str {
        match self.content.char_indices().nth(self.overlap_chars) {
            Some((byte, _)) => &self.content[byte..],
            None => "",
        }
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A retrieved [`Chunk`] paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity, higher is more relevant.
    pub score: f32,
}
