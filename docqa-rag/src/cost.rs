//! Embedding cost estimation.
//!
//! Token counts come from the BPE tokenizer registered for the embedding
//! model, so they approximate what the provider bills. Providers may
//! tokenize slightly differently; treat the result as an estimate.

use std::fmt;

use tiktoken_rs::CoreBPE;
use tracing::debug;

use crate::document::Chunk;
use crate::error::{RagError, Result};

/// Token total and projected price for embedding a set of chunks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub total_tokens: usize,
    /// USD.
    pub estimated_cost: f64,
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tokens, ${:.4}", self.total_tokens, self.estimated_cost)
    }
}

/// Counts tokens with a model's tokenizer and prices them per 1000.
pub struct CostEstimator {
    bpe: CoreBPE,
    unit_price: f64,
}

impl fmt::Debug for CostEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostEstimator").field("unit_price", &self.unit_price).finish_non_exhaustive()
    }
}

impl CostEstimator {
    /// Use the tokenizer registered for `model`, e.g. `text-embedding-ada-002`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if no tokenizer is known
    /// for the model or the price is negative.
    pub fn for_model(model: &str, unit_price: f64) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|e| {
            RagError::InvalidConfiguration(format!("no tokenizer for model '{model}': {e}"))
        })?;
        Self::with_tokenizer(bpe, unit_price)
    }

    /// Use the `cl100k_base` encoding shared by current OpenAI embedding models.
    pub fn cl100k(unit_price: f64) -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| {
            RagError::InvalidConfiguration(format!("failed to load cl100k_base: {e}"))
        })?;
        Self::with_tokenizer(bpe, unit_price)
    }

    fn with_tokenizer(bpe: CoreBPE, unit_price: f64) -> Result<Self> {
        if !(unit_price.is_finite() && unit_price >= 0.0) {
            return Err(RagError::InvalidConfiguration(format!(
                "unit_price ({unit_price}) must be a non-negative number"
            )));
        }
        Ok(Self { bpe, unit_price })
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    /// Number of tokens in `text`.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Estimate the cost of embedding every chunk.
    ///
    /// `estimated_cost = total_tokens / 1000 * unit_price`.
    pub fn estimate(&self, chunks: &[Chunk]) -> CostEstimate {
        let total_tokens: usize = chunks.iter().map(|c| self.count_tokens(&c.content)).sum();
        let estimated_cost = total_tokens as f64 / 1000.0 * self.unit_price;
        debug!(chunk_count = chunks.len(), total_tokens, estimated_cost, "estimated embedding cost");
        CostEstimate { total_tokens, estimated_cost }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceLocator;

    fn chunk(text: &str, i: usize) -> Chunk {
        Chunk {
            content: text.into(),
            metadata: SourceLocator::default(),
            sequence_index: i,
            segment_index: 0,
            start_char: 0,
            overlap_chars: 0,
        }
    }

    #[test]
    fn empty_input_costs_nothing() {
        let estimator = CostEstimator::for_model("text-embedding-ada-002", 0.0004).unwrap();
        assert_eq!(
            estimator.estimate(&[]),
            CostEstimate { total_tokens: 0, estimated_cost: 0.0 }
        );
    }

    #[test]
    fn cost_scales_with_tokens() {
        let estimator = CostEstimator::cl100k(0.0004).unwrap();
        let chunks = vec![chunk("hello world", 0), chunk("hello world", 1)];
        let single = estimator.count_tokens("hello world");
        assert!(single > 0);

        let estimate = estimator.estimate(&chunks);
        assert_eq!(estimate.total_tokens, single * 2);
        let expected = (single * 2) as f64 / 1000.0 * 0.0004;
        assert!((estimate.estimated_cost - expected).abs() < 1e-12);
    }

    #[test]
    fn rejects_negative_price() {
        assert!(matches!(
            CostEstimator::cl100k(-0.1),
            Err(RagError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn display_uses_four_decimals() {
        let estimate = CostEstimate { total_tokens: 1500, estimated_cost: 0.0006 };
        assert_eq!(estimate.to_string(), "1500 tokens, $0.0006");
    }
}
