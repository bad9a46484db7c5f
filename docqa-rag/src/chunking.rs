//! Splitting loaded segments into bounded, overlapping chunks.
//!
//! Sizes are measured in characters (Unicode scalar values). Every chunk
//! holds at most `chunk_size` characters, and each chunk after the first in
//! a segment starts with the last `chunk_overlap` characters of its
//! predecessor. Chunks never span two segments, so page metadata stays
//! exact. Dropping the overlap prefix of every chunk
//! ([`Chunk::fresh_content`]) and concatenating the rest rebuilds each
//! segment's text exactly.
//!
//! Two strategies implement [`Chunker`]:
//!
//! - [`RecursiveChunker`] prefers paragraph, line, sentence and word
//!   boundaries, falling back to a hard split
//! - [`FixedSizeChunker`] always cuts at exactly `chunk_size` characters

use std::sync::Arc;

use crate::config::{RagConfig, Splitter};
use crate::document::{Chunk, Segment};
use crate::error::{RagError, Result};

/// A strategy for splitting segments into chunks.
///
/// Returns an empty `Vec` for empty input. `sequence_index` runs from 0
/// across all produced chunks in document order.
pub trait Chunker: Send + Sync {
    fn chunk(&self, segments: &[Segment]) -> Vec<Chunk>;
}

/// Boundary tiers, strongest first. Within a tier the latest match wins.
const BOUNDARY_TIERS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InvalidConfiguration("chunk_size must be greater than zero".into()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::InvalidConfiguration(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Splits at the strongest natural boundary that fits the window.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(512, 20)?;
/// let chunks = chunker.chunk(&segments);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, segments: &[Segment]) -> Vec<Chunk> {
        slide_windows(segments, self.chunk_size, self.chunk_overlap, boundary_end)
    }
}

/// Cuts every window at exactly `chunk_size` characters.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, segments: &[Segment]) -> Vec<Chunk> {
        slide_windows(segments, self.chunk_size, self.chunk_overlap, |_, _, max_end| max_end)
    }
}

/// Chunk segments with the boundary-preferring strategy.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`] if `chunk_overlap >= chunk_size`,
/// regardless of the input.
pub fn chunk_segments(
    segments: &[Segment],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    Ok(RecursiveChunker::new(chunk_size, chunk_overlap)?.chunk(segments))
}

/// Build the chunker selected by the configuration.
pub fn chunker_for(config: &RagConfig) -> Result<Arc<dyn Chunker>> {
    Ok(match config.splitter {
        Splitter::Recursive => Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?),
        Splitter::Fixed => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
    })
}

/// Walk each segment with a window of `chunk_size` characters.
///
/// `pick_end(chars, min_end, max_end)` chooses where a full window ends; it
/// must return a value in `min_end..=max_end`. `min_end` lies past the
/// overlap so the next window always starts further along.
fn slide_windows<F>(
    segments: &[Segment],
    chunk_size: usize,
    chunk_overlap: usize,
    pick_end: F,
) -> Vec<Chunk>
where
    F: Fn(&[char], usize, usize) -> usize,
{
    let mut chunks = Vec::new();

    for (segment_index, segment) in segments.iter().enumerate() {
        let chars: Vec<char> = segment.content.chars().collect();
        let mut start = 0;
        let mut overlap_chars = 0;

        while start < chars.len() {
            let end = if chars.len() - start <= chunk_size {
                chars.len()
            } else {
                let min_end = start + chunk_overlap + 1;
                let max_end = start + chunk_size;
                pick_end(&chars, min_end, max_end).clamp(min_end, max_end)
            };

            chunks.push(Chunk {
                content: chars[start..end].iter().collect(),
                metadata: segment.metadata.clone(),
                sequence_index: chunks.len(),
                segment_index,
                start_char: start,
                overlap_chars,
            });

            if end == chars.len() {
                break;
            }
            start = end - chunk_overlap;
            overlap_chars = chunk_overlap;
        }
    }

    chunks
}

/// The end of the strongest boundary within `min_end..=max_end`, or `max_end`.
///
/// The separator stays with the chunk it terminates.
fn boundary_end(chars: &[char], min_end: usize, max_end: usize) -> usize {
    for tier in BOUNDARY_TIERS {
        let best = tier.iter().filter_map(|sep| last_separator_end(chars, sep, min_end, max_end)).max();
        if let Some(end) = best {
            return end;
        }
    }
    max_end
}

fn last_separator_end(chars: &[char], separator: &str, min_end: usize, max_end: usize) -> Option<usize> {
    let sep: Vec<char> = separator.chars().collect();
    (min_end..=max_end)
        .rev()
        .filter(|&end| end >= sep.len())
        .find(|&end| chars[end - sep.len()..end] == sep[..])
}
