//! Embedding index: vectors plus the chunks they were computed from.
//!
//! [`InMemoryIndex::build`] embeds every chunk before returning. If any
//! batch fails, or the build is cancelled, no index value is produced, so
//! a half-built index can never be searched. A built index is immutable;
//! indexing another document means building a new one.

use std::cmp::Ordering;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::document::{Chunk, ScoredChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// One embedded chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub chunk: Chunk,
}

/// A similarity-searchable collection of embedded chunks.
///
/// Results are ordered by descending similarity, ties broken by ascending
/// `sequence_index`, and never exceed `min(k, len())` entries.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Number of entries in the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The embedding model the entries were computed with.
    fn embedding_model(&self) -> &str;

    /// Find the `k` entries most similar to `query`.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;
}

/// An in-memory index scored by cosine similarity.
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    entries: Vec<IndexEntry>,
    embedding_model: String,
    dimensions: usize,
}

impl InMemoryIndex {
    /// Embed all chunks with `provider`, `batch_size` chunks per request.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if any batch fails or returns
    /// vectors of the wrong count or dimension.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        chunks: Vec<Chunk>,
        batch_size: usize,
    ) -> Result<Self> {
        Self::build_cancellable(provider, chunks, batch_size, &CancellationToken::new()).await
    }

    /// Like [`build`](Self::build), aborting with [`RagError::Cancelled`]
    /// as soon as `cancel` fires.
    pub async fn build_cancellable(
        provider: &dyn EmbeddingProvider,
        chunks: Vec<Chunk>,
        batch_size: usize,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "embedding batch size must be greater than zero".into(),
            ));
        }

        let model = provider.model_id().to_string();
        let dimensions = provider.dimensions();
        let mut entries = Vec::with_capacity(chunks.len());

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                warn!(batch_no, "index build cancelled");
                return Err(RagError::Cancelled("index build cancelled".into()));
            }

            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            debug!(batch_no, batch_size = texts.len(), model = %model, "embedding batch");

            let vectors = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(batch_no, "index build cancelled while embedding");
                    return Err(RagError::Cancelled("index build cancelled".into()));
                }
                result = provider.embed_batch(&texts) => result.map_err(|e| as_embedding_error(&model, e))?,
            };

            if vectors.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: model,
                    message: format!(
                        "expected {} embeddings, provider returned {}",
                        batch.len(),
                        vectors.len()
                    ),
                });
            }

            for (chunk, embedding) in batch.iter().zip(vectors) {
                if embedding.len() != dimensions {
                    return Err(RagError::EmbeddingError {
                        provider: model,
                        message: format!(
                            "chunk {} embedded to {} dimensions, expected {dimensions}",
                            chunk.sequence_index,
                            embedding.len()
                        ),
                    });
                }
                entries.push(IndexEntry { embedding, chunk: chunk.clone() });
            }
        }

        info!(entry_count = entries.len(), model = %model, dimensions, "index built");
        Ok(Self { entries, embedding_model: model, dimensions })
    }

    /// Assemble an index from precomputed entries.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if entries disagree on dimensionality.
    pub fn from_entries(embedding_model: impl Into<String>, entries: Vec<IndexEntry>) -> Result<Self> {
        let embedding_model = embedding_model.into();
        let dimensions = entries.first().map_or(0, |e| e.embedding.len());
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::EmbeddingError {
                provider: embedding_model,
                message: format!(
                    "entry {} has {} dimensions, expected {dimensions}",
                    bad.chunk.sequence_index,
                    bad.embedding.len()
                ),
            });
        }
        Ok(Self { entries, embedding_model, dimensions })
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn as_embedding_error(model: &str, err: RagError) -> RagError {
    match err {
        e @ RagError::EmbeddingError { .. } => e,
        other => RagError::EmbeddingError { provider: model.to_string(), message: other.to_string() },
    }
}

/// Cosine similarity of two vectors; 0.0 when either has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() { similarity } else { 0.0 }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(RagError::InvalidConfiguration("k must be greater than zero".into()));
        }
        if !self.entries.is_empty() && query.len() != self.dimensions {
            return Err(RagError::EmbeddingError {
                provider: self.embedding_model.clone(),
                message: format!(
                    "query has {} dimensions, index has {}",
                    query.len(),
                    self.dimensions
                ),
            });
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, query),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.sequence_index.cmp(&b.chunk.sequence_index))
        });
        scored.truncate(k);
        Ok(scored)
    }
}
