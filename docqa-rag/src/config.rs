//! Configuration for loading, indexing and answering.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Which chunking strategy to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Splitter {
    /// Prefer paragraph, line, sentence and word boundaries.
    #[default]
    Recursive,
    /// Hard splits every `chunk_size` characters.
    Fixed,
}

impl std::str::FromStr for Splitter {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "recursive" => Ok(Splitter::Recursive),
            "fixed" => Ok(Splitter::Fixed),
            other => Err(RagError::InvalidConfiguration(format!("unknown splitter '{other}'"))),
        }
    }
}

/// Configuration parameters for a document QA session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of a segment.
    pub chunk_overlap: usize,
    /// Chunking strategy.
    pub splitter: Splitter,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Embedding price in USD per 1000 tokens.
    pub unit_price: f64,
    /// Embedding model used for both indexing and queries.
    pub embedding_model: String,
    /// Number of chunks sent to the embedding provider per request.
    pub embedding_batch_size: usize,
    /// Chat model that writes the answer.
    pub chat_model: String,
    /// Sampling temperature for the chat model.
    pub temperature: f32,
    /// Upper bound on the composed prompt, in characters.
    pub max_prompt_chars: usize,
    /// Time allowed for a single model call.
    #[serde(with = "duration_secs")]
    pub model_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 20,
            splitter: Splitter::Recursive,
            top_k: 3,
            unit_price: 0.0004,
            embedding_model: "text-embedding-ada-002".to_string(),
            embedding_batch_size: 64,
            chat_model: "gpt-4".to_string(),
            temperature: 1.0,
            max_prompt_chars: 12_000,
            model_timeout: Duration::from_secs(60),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that all parameters are in range and consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RagError::InvalidConfiguration(msg));
        if self.chunk_size == 0 {
            return invalid("chunk_size must be greater than zero".into());
        }
        if self.chunk_overlap >= self.chunk_size {
            return invalid(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.top_k == 0 {
            return invalid("top_k must be greater than zero".into());
        }
        if !(self.unit_price.is_finite() && self.unit_price >= 0.0) {
            return invalid(format!("unit_price ({}) must be a non-negative number", self.unit_price));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return invalid(format!("temperature ({}) must be within 0.0..=2.0", self.temperature));
        }
        if self.embedding_batch_size == 0 {
            return invalid("embedding_batch_size must be greater than zero".into());
        }
        if self.max_prompt_chars == 0 {
            return invalid("max_prompt_chars must be greater than zero".into());
        }
        if self.model_timeout.is_zero() {
            return invalid("model_timeout must be greater than zero".into());
        }
        if self.embedding_model.trim().is_empty() || self.chat_model.trim().is_empty() {
            return invalid("model identifiers must not be empty".into());
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set how chunk boundaries are chosen.
    pub fn splitter(mut self, splitter: Splitter) -> Self {
        self.config.splitter = splitter;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the embedding price in USD per 1,000 tokens.
    pub fn unit_price(mut self, price: f64) -> Self {
        self.config.unit_price = price;
        self
    }

    /// Set the embedding model, which also selects the tokenizer for cost estimates.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set how many chunks are sent per embedding request.
    pub fn embedding_batch_size(mut self, size: usize) -> Self {
        self.config.embedding_batch_size = size;
        self
    }

    /// Set the chat model that answers questions.
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = model.into();
        self
    }

    /// Set the sampling temperature. Anything above zero makes answers vary between calls.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the maximum prompt length in characters.
    pub fn max_prompt_chars(mut self, chars: usize) -> Self {
        self.config.max_prompt_chars = chars;
        self
    }

    /// Set how long to wait for the chat model before giving up.
    pub fn model_timeout(mut self, timeout: Duration) -> Self {
        self.config.model_timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if any check in
    /// [`RagConfig::validate`] fails.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 20);
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().temperature(2.5).build().is_err());
        assert!(RagConfig::builder().unit_price(-1.0).build().is_err());
        assert!(RagConfig::builder().model_timeout(Duration::ZERO).build().is_err());
        assert!(RagConfig::builder().chat_model("  ").build().is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let config = RagConfig::builder().splitter(Splitter::Fixed).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"splitter\":\"fixed\""));
        assert!(json.contains("\"model_timeout\":60.0"));
        let back: RagConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn parses_splitter_names() {
        assert_eq!("Fixed".parse::<Splitter>().unwrap(), Splitter::Fixed);
        assert!("semantic".parse::<Splitter>().is_err());
    }
}
