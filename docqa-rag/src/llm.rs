//! Language model capability used to write answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model_id: String,
    pub temperature: f32,
}

/// A provider of text completions.
///
/// With a non-zero temperature the same request may produce different
/// answers on every call. That is expected behaviour, not a defect.
/// Failures should be reported as [`RagError::ModelCallFailure`](crate::RagError::ModelCallFailure).
#[async_trait]
pub trait LanguageModelProvider: Send + Sync {
    /// A short name for logs and error messages.
    fn name(&self) -> &str;

    /// Complete the prompt and return the generated text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}
