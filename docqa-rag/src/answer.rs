//! Retrieval-augmented answering.
//!
//! [`AnswerEngine::answer`] runs a fixed sequence of stages, each of which
//! fails terminally:
//!
//! 1. `embed_query` embeds the question with the model the index was built with
//! 2. `retrieve` fetches the `k` most similar chunks
//! 3. `compose_prompt` stuffs those chunks, best first, into a bounded prompt
//! 4. `call_model` asks the language model, bounded by a timeout
//!
//! No stage retries and none substitutes a placeholder answer.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::ScoredChunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};
use crate::index::SimilarityIndex;
use crate::llm::{CompletionRequest, LanguageModelProvider};

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, say that you don't know; do not make up an answer.";

/// A model answer with the chunks that grounded it, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<ScoredChunk>,
}

/// Answers questions against a [`SimilarityIndex`].
pub struct AnswerEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn LanguageModelProvider>,
    chat_model: String,
    temperature: f32,
    max_prompt_chars: usize,
    timeout: Duration,
}

impl AnswerEngine {
    /// Create an engine using the chat settings from `config`.
    ///
    /// `embedder` must be the provider (same model) the index was built with.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModelProvider>,
        config: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            model,
            chat_model: config.chat_model.clone(),
            temperature: config.temperature,
            max_prompt_chars: config.max_prompt_chars,
            timeout: config.model_timeout,
        }
    }

    /// Answer `query` from the `k` chunks of `index` most similar to it.
    ///
    /// `k` larger than the index is clamped, not rejected.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidConfiguration`] for `k == 0`, an empty query, or an
    ///   index built with a different embedding model
    /// - [`RagError::EmptyIndex`] if the index has no entries
    /// - [`RagError::EmbeddingError`] if the query cannot be embedded
    /// - [`RagError::ModelCallFailure`] / [`RagError::ModelCallTimeout`] from the model call
    pub async fn answer(&self, index: &dyn SimilarityIndex, query: &str, k: usize) -> Result<Answer> {
        if k == 0 {
            return Err(RagError::InvalidConfiguration("k must be greater than zero".into()));
        }
        if query.trim().is_empty() {
            return Err(RagError::InvalidConfiguration("query must not be empty".into()));
        }
        if index.embedding_model() != self.embedder.model_id() {
            return Err(RagError::InvalidConfiguration(format!(
                "index was built with '{}' but queries are embedded with '{}'",
                index.embedding_model(),
                self.embedder.model_id()
            ))
            .at_stage(Stage::EmbedQuery));
        }
        // Checked up front so an empty index costs no embedding call.
        if index.is_empty() {
            error!(stage = %Stage::Retrieve, "index is empty");
            return Err(RagError::EmptyIndex);
        }

        let query_vector = self.embedder.embed(query).await.map_err(|e| {
            error!(stage = %Stage::EmbedQuery, error = %e, "query embedding failed");
            match e {
                e @ RagError::EmbeddingError { .. } => e,
                other => RagError::EmbeddingError {
                    provider: self.embedder.model_id().to_string(),
                    message: other.to_string(),
                },
            }
            .at_stage(Stage::EmbedQuery)
        })?;

        let retrieved = index.search(&query_vector, k).await.map_err(|e| {
            error!(stage = %Stage::Retrieve, error = %e, "search failed");
            e.at_stage(Stage::Retrieve)
        })?;
        if retrieved.is_empty() {
            return Err(RagError::EmptyIndex);
        }
        debug!(stage = %Stage::Retrieve, k, retrieved = retrieved.len(), "retrieved context");

        let (prompt, used) = compose_prompt(query, &retrieved, self.max_prompt_chars)
            .map_err(|e| e.at_stage(Stage::ComposePrompt))?;
        let mut sources = retrieved;
        sources.truncate(used);
        debug!(stage = %Stage::ComposePrompt, prompt_chars = prompt.chars().count(), used, "prompt composed");

        let request = CompletionRequest {
            prompt,
            model_id: self.chat_model.clone(),
            temperature: self.temperature,
        };
        let provider = self.model.name().to_string();
        let text = match tokio::time::timeout(self.timeout, self.model.complete(request)).await {
            Err(_) => {
                error!(stage = %Stage::CallModel, provider = %provider, timeout = ?self.timeout, "model call timed out");
                return Err(RagError::ModelCallTimeout { provider, timeout: self.timeout });
            }
            Ok(Err(e)) => {
                error!(stage = %Stage::CallModel, provider = %provider, error = %e, "model call failed");
                let err = match e {
                    e @ (RagError::ModelCallFailure { .. } | RagError::ModelCallTimeout { .. }) => e,
                    other => RagError::ModelCallFailure { provider, message: other.to_string() },
                };
                return Err(err.at_stage(Stage::CallModel));
            }
            Ok(Ok(text)) => text,
        };

        let text = text.trim().to_string();
        info!(sources = sources.len(), answer_chars = text.chars().count(), "question answered");
        Ok(Answer { text, sources })
    }
}

/// Build the prompt from the question and retrieved chunks (best first).
///
/// When the prompt would exceed `max_chars` characters, the lowest-ranked
/// chunks are dropped until it fits. The best chunk is never dropped.
/// Returns the prompt and the number of chunks it contains.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`] if the question together with
/// the best chunk (or alone, when `context` is empty) does not fit.
pub fn compose_prompt(query: &str, context: &[ScoredChunk], max_chars: usize) -> Result<(String, usize)> {
    let min_used = usize::from(!context.is_empty());
    for used in (min_used..=context.len()).rev() {
        let prompt = render_prompt(query, &context[..used]);
        if prompt.chars().count() <= max_chars {
            return Ok((prompt, used));
        }
    }
    Err(RagError::InvalidConfiguration(if context.is_empty() {
        format!("question does not fit within max_prompt_chars ({max_chars})")
    } else {
        format!("question and best chunk do not fit within max_prompt_chars ({max_chars})")
    }))
}

fn render_prompt(query: &str, context: &[ScoredChunk]) -> String {
    let body = context.iter().map(|c| c.chunk.content.as_str()).collect::<Vec<_>>().join("\n\n");
    format!("{PROMPT_PREAMBLE}\n\n{body}\n\nQuestion: {query}\nHelpful Answer:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, SourceLocator};

    fn scored(text: &str, i: usize, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                content: text.into(),
                metadata: SourceLocator::default(),
                sequence_index: i,
                segment_index: 0,
                start_char: 0,
                overlap_chars: 0,
            },
            score,
        }
    }

    #[test]
    fn prompt_keeps_similarity_order() {
        let context = [scored("best", 4, 0.9), scored("second", 1, 0.5)];
        let (prompt, used) = compose_prompt("What?", &context, 10_000).unwrap();
        assert_eq!(used, 2);
        let best = prompt.find("best").unwrap();
        let second = prompt.find("second").unwrap();
        assert!(best < second);
        assert!(prompt.ends_with("Question: What?\nHelpful Answer:"));
    }

    #[test]
    fn prompt_drops_lowest_ranked_chunks_first() {
        let context = [scored(&"a".repeat(50), 0, 0.9), scored(&"b".repeat(50), 1, 0.8)];
        let bare = render_prompt("Q", &[]).chars().count();
        let (prompt, used) = compose_prompt("Q", &context, bare + 60).unwrap();
        assert_eq!(used, 1);
        assert!(prompt.contains(&"a".repeat(50)));
        assert!(!prompt.contains(&"b".repeat(50)));
    }

    #[test]
    fn best_chunk_is_never_dropped() {
        let context = [scored(&"a".repeat(280), 0, 0.9)];
        let bare = render_prompt("Q", &[]).chars().count();
        let err = compose_prompt("Q", &context, bare + 100).unwrap_err();
        assert!(matches!(err, RagError::InvalidConfiguration(_)));
    }

    #[test]
    fn oversized_question_is_rejected() {
        let err = compose_prompt(&"x".repeat(100), &[], 50).unwrap_err();
        assert!(matches!(err, RagError::InvalidConfiguration(_)));
    }
}
