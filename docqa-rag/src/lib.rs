//! # docqa-rag
//!
//! Question answering over a single document.
//!
//! ## Overview
//!
//! A document goes through a short pipeline before it can be questioned:
//!
//! - [`loader`] reads PDF (one segment per page), DOCX and plain text files
//! - [`chunking`] splits segments into bounded, overlapping chunks
//! - [`cost`] estimates what embedding the chunks will cost
//! - [`index`] embeds the chunks and stores them for cosine-similarity search
//! - [`answer`] retrieves the best chunks for a question and asks a language model
//! - [`session`] keeps the active index and a transcript of answered questions
//!
//! Embedding and completion are capabilities injected through the
//! [`EmbeddingProvider`] and [`LanguageModelProvider`] traits. OpenAI-compatible
//! implementations live in [`openai`] (feature `openai`, on by default);
//! deterministic ones for tests live in [`mock`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{AnswerEngine, IngestPipeline, RagConfig, Session};
//! use docqa_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
//!
//! let config = RagConfig::builder().chunk_size(256).top_k(3).build()?;
//! let embedder = Arc::new(OpenAIEmbeddingProvider::from_env()?);
//! let pipeline = IngestPipeline::builder()
//!     .config(config.clone())
//!     .embedding_provider(embedder.clone())
//!     .build()?;
//!
//! let report = pipeline.ingest(Path::new("paper.pdf"), &CancellationToken::new()).await?;
//! let mut session = Session::new();
//! session.set_index(report.index);
//!
//! let engine = AnswerEngine::new(embedder, Arc::new(OpenAIChatModel::from_env()?), &config);
//! let answer = session.ask(&engine, "What is the paper about?", config.top_k).await?;
//! ```

pub mod answer;
pub mod chunking;
pub mod config;
pub mod cost;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod loader;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod session;

pub use answer::{Answer, AnswerEngine, compose_prompt};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, chunk_segments, chunker_for};
pub use config::{RagConfig, RagConfigBuilder, Splitter};
pub use cost::{CostEstimate, CostEstimator};
pub use document::{Chunk, ScoredChunk, Segment, SourceDocument, SourceFormat, SourceLocator};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result, Stage};
pub use index::{InMemoryIndex, IndexEntry, SimilarityIndex, cosine_similarity};
pub use llm::{CompletionRequest, LanguageModelProvider};
pub use pipeline::{IngestPipeline, IngestPipelineBuilder, IngestReport, PreparedDocument};
pub use session::{QueryRecord, Session};
