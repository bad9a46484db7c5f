//! Error types for the `docqa-rag` crate.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// A stage of the answer state machine.
///
/// Errors raised while answering carry the stage they failed in as part of
/// their message, see [`RagError::at_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EmbedQuery,
    Retrieve,
    ComposePrompt,
    CallModel,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::EmbedQuery => "embed_query",
            Stage::Retrieve => "retrieve",
            Stage::ComposePrompt => "compose_prompt",
            Stage::CallModel => "call_model",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while loading, indexing or answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// The declared file format is not one of PDF, DOCX or plain text.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The source could not be read or parsed.
    #[error("Failed to load '{source_name}': {message}")]
    LoadFailure {
        /// File name or path of the source.
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration parameter is out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The embedding provider failed or returned malformed vectors.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider (or model) that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The index holds no entries to retrieve from.
    #[error("Index is empty")]
    EmptyIndex,

    /// A question was asked before any document was indexed.
    #[error("No document has been indexed yet")]
    NoActiveIndex,

    /// The language model provider failed.
    #[error("Model call failed ({provider}): {message}")]
    ModelCallFailure {
        /// The language model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The language model did not answer within the configured timeout.
    #[error("Model call to {provider} timed out after {timeout:?}")]
    ModelCallTimeout {
        /// The language model provider that was called.
        provider: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// An index build was cancelled before it completed.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl RagError {
    /// Prefix the error message with the stage it occurred in.
    ///
    /// The error kind is preserved so callers can still match on it.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            RagError::EmbeddingError { provider, message } => {
                RagError::EmbeddingError { provider, message: format!("[{stage}] {message}") }
            }
            RagError::ModelCallFailure { provider, message } => {
                RagError::ModelCallFailure { provider, message: format!("[{stage}] {message}") }
            }
            RagError::InvalidConfiguration(message) => {
                RagError::InvalidConfiguration(format!("[{stage}] {message}"))
            }
            other => other,
        }
    }

    /// Whether the failure came from an external provider and may succeed on retry.
    ///
    /// This crate never retries by itself; the flag is for the calling layer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingError { .. }
                | RagError::ModelCallFailure { .. }
                | RagError::ModelCallTimeout { .. }
        )
    }
}

/// A convenience result type for document QA operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_tag_keeps_error_kind() {
        let err = RagError::ModelCallFailure { provider: "mock".into(), message: "boom".into() }
            .at_stage(Stage::CallModel);
        match err {
            RagError::ModelCallFailure { message, .. } => assert_eq!(message, "[call_model] boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_index_is_not_retryable() {
        assert!(!RagError::EmptyIndex.at_stage(Stage::Retrieve).is_retryable());
        assert!(
            RagError::ModelCallTimeout { provider: "x".into(), timeout: Duration::from_secs(1) }
                .is_retryable()
        );
    }
}
