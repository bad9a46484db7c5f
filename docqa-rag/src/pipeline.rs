//! Document ingestion: load → chunk → estimate → embed → index.
//!
//! Ingestion is split in two so callers can show the cost before paying it:
//! [`IngestPipeline::prepare`] loads, chunks and estimates;
//! [`IngestPipeline::build_index`] embeds. [`IngestPipeline::ingest`] does
//! both and [`IngestPipeline::spawn_ingest`] runs it as a background task.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{IngestPipeline, RagConfig};
//!
//! let pipeline = IngestPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .build()?;
//!
//! let prepared = pipeline.prepare(Path::new("report.pdf")).await?;
//! println!("{} chunks, {}", prepared.chunks.len(), prepared.estimate);
//! let index = pipeline.build_index(prepared, &CancellationToken::new()).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chunking::{Chunker, chunker_for};
use crate::config::RagConfig;
use crate::cost::{CostEstimate, CostEstimator};
use crate::document::{Chunk, Segment, SourceDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::InMemoryIndex;
use crate::loader;

/// A loaded and chunked document that has not been embedded yet.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub source: String,
    pub segment_count: usize,
    pub chunks: Vec<Chunk>,
    pub estimate: CostEstimate,
}

/// The outcome of a complete ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub source: String,
    pub chunk_count: usize,
    pub estimate: CostEstimate,
    pub index: Arc<InMemoryIndex>,
}

/// Turns documents into searchable indexes.
pub struct IngestPipeline {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    estimator: Arc<CostEstimator>,
}

impl IngestPipeline {
    pub fn builder() -> IngestPipelineBuilder {
        IngestPipelineBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Load, chunk and price a file. Parsing runs on the blocking pool.
    pub async fn prepare(&self, path: &Path) -> Result<PreparedDocument> {
        let source = path.display().to_string();
        let segments = loader::load_path_async(path.to_path_buf()).await?;
        Ok(self.prepare_segments(source, &segments))
    }

    /// Load, chunk and price an in-memory document.
    pub fn prepare_source(&self, document: &SourceDocument) -> Result<PreparedDocument> {
        let segments = loader::load(document)?;
        Ok(self.prepare_segments(document.name().to_string(), &segments))
    }

    /// Chunk and price already-loaded segments.
    pub fn prepare_segments(&self, source: String, segments: &[Segment]) -> PreparedDocument {
        let chunks = self.chunker.chunk(segments);
        let estimate = self.estimator.estimate(&chunks);
        info!(
            source = %source,
            segment_count = segments.len(),
            chunk_count = chunks.len(),
            total_tokens = estimate.total_tokens,
            estimated_cost = estimate.estimated_cost,
            "document prepared"
        );
        PreparedDocument { source, segment_count: segments.len(), chunks, estimate }
    }

    /// Embed a prepared document into a new index.
    ///
    /// # Errors
    ///
    /// [`RagError::EmbeddingError`] if any chunk fails to embed and
    /// [`RagError::Cancelled`] if `cancel` fires first. Either way no index
    /// is returned.
    pub async fn build_index(
        &self,
        prepared: PreparedDocument,
        cancel: &CancellationToken,
    ) -> Result<InMemoryIndex> {
        InMemoryIndex::build_cancellable(
            self.embedder.as_ref(),
            prepared.chunks,
            self.config.embedding_batch_size,
            cancel,
        )
        .await
    }

    /// Prepare and index a file in one step.
    pub async fn ingest(&self, path: &Path, cancel: &CancellationToken) -> Result<IngestReport> {
        let prepared = self.prepare(path).await?;
        let source = prepared.source.clone();
        let chunk_count = prepared.chunks.len();
        let estimate = prepared.estimate;
        let index = self.build_index(prepared, cancel).await?;
        Ok(IngestReport { source, chunk_count, estimate, index: Arc::new(index) })
    }

    /// Run [`ingest`](Self::ingest) on a background task.
    pub fn spawn_ingest(
        self: &Arc<Self>,
        path: PathBuf,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<IngestReport>> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.ingest(&path, &cancel).await })
    }
}

/// Builder for an [`IngestPipeline`].
///
/// `config` and `embedding_provider` are required. The chunker defaults to
/// the one selected by the config, the estimator to the tokenizer of the
/// configured embedding model (`cl100k_base` if the model is unknown).
#[derive(Default)]
pub struct IngestPipelineBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    estimator: Option<Arc<CostEstimator>>,
}

impl IngestPipelineBuilder {
    /// Set the configuration. Required.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the provider used to embed chunks. Required.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    /// Override the chunker selected by the configuration.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the cost estimator derived from the embedding model.
    pub fn cost_estimator(mut self, estimator: Arc<CostEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if a required field is
    /// missing or the config does not validate.
    pub fn build(self) -> Result<IngestPipeline> {
        let config = self
            .config
            .ok_or_else(|| RagError::InvalidConfiguration("config is required".into()))?;
        config.validate()?;
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::InvalidConfiguration("embedding_provider is required".into()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => chunker_for(&config)?,
        };
        let estimator = match self.estimator {
            Some(estimator) => estimator,
            None => Arc::new(default_estimator(&config)?),
        };
        Ok(IngestPipeline { config, embedder, chunker, estimator })
    }
}

fn default_estimator(config: &RagConfig) -> Result<CostEstimator> {
    CostEstimator::for_model(&config.embedding_model, config.unit_price).or_else(|e| {
        warn!(model = %config.embedding_model, error = %e, "falling back to cl100k_base tokenizer");
        CostEstimator::cl100k(config.unit_price)
    })
}
