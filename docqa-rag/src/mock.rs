//! Deterministic providers for tests and offline demos.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::{CompletionRequest, LanguageModelProvider};

/// Hashed bag-of-words embeddings.
///
/// Each lowercase alphanumeric word adds ±1 to one of `dimensions` buckets
/// and the result is L2-normalised, so texts sharing words score higher.
/// Text without words embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
    model_id: String,
}

impl HashEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1), model_id: "hash-bow".to_string() }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = fnv1a(&word.to_lowercase());
            let bucket = (hash % self.dimensions as u64) as usize;
            v[bucket] += if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3))
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Reply(String),
    Fail(String),
    Delay(Duration, String),
}

/// A scripted language model that records every request it receives.
#[derive(Debug)]
pub struct MockLanguageModel {
    behavior: Behavior,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLanguageModel {
    /// Always answer with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with(Behavior::Reply(text.into()))
    }

    /// Always fail with a [`RagError::ModelCallFailure`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with(Behavior::Fail(message.into()))
    }

    /// Answer with `text` after sleeping for `delay`.
    pub fn delayed(delay: Duration, text: impl Into<String>) -> Self {
        Self::with(Behavior::Delay(delay, text.into()))
    }

    fn with(behavior: Behavior) -> Self {
        Self { behavior, requests: Mutex::new(Vec::new()) }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModelProvider for MockLanguageModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Fail(message) => {
                Err(RagError::ModelCallFailure { provider: "mock".into(), message: message.clone() })
            }
            Behavior::Delay(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
        }
    }
}
