//! Command-line arguments.
//!
//! Every option can also come from the environment (or a `.env` file),
//! which is how API credentials are normally supplied.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use docqa_rag::openai::{OPENAI_API_BASE, OpenAIChatModel, OpenAIEmbeddingProvider};
use docqa_rag::{EmbeddingProvider, LanguageModelProvider, RagConfig, Splitter};
use docqa_telemetry::{LogFormat, TelemetryConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "docqa", version, about = "Ask questions about a PDF, DOCX or text document")]
pub struct Args {
    /// Document to load at startup (.pdf, .docx or .txt)
    #[arg(short, long, env = "DOCQA_FILE")]
    pub file: Option<PathBuf>,

    /// Answer this question about --file and exit
    #[arg(short, long, requires = "file")]
    pub question: Option<String>,

    /// Maximum characters per chunk
    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value_t = 512)]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", default_value_t = 20)]
    pub chunk_overlap: usize,

    /// How chunk boundaries are chosen (recursive or fixed)
    #[arg(long, env = "DOCQA_SPLITTER", default_value = "recursive")]
    pub splitter: Splitter,

    /// Number of chunks retrieved per question
    #[arg(short = 'k', long, env = "DOCQA_TOP_K", default_value_t = 3)]
    pub top_k: usize,

    /// Embedding model
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", default_value = "text-embedding-ada-002")]
    pub embedding_model: String,

    /// Request embeddings truncated to this many dimensions (text-embedding-3 models)
    #[arg(long, env = "DOCQA_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Chat model used to answer
    #[arg(long, env = "DOCQA_CHAT_MODEL", default_value = "gpt-4")]
    pub chat_model: String,

    /// Sampling temperature; above zero answers vary between runs
    #[arg(long, env = "DOCQA_TEMPERATURE", default_value_t = 1.0)]
    pub temperature: f32,

    /// Embedding price in USD per 1,000 tokens
    #[arg(long, env = "DOCQA_UNIT_PRICE", default_value_t = 0.0004)]
    pub unit_price: f64,

    /// Refuse to embed documents whose estimated cost exceeds this many USD
    #[arg(long, env = "DOCQA_MAX_COST")]
    pub max_cost: Option<f64>,

    /// Seconds to wait for the chat model
    #[arg(long, env = "DOCQA_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// API key for the OpenAI-compatible server
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible server
    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_API_BASE)]
    pub base_url: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "DOCQA_LOG", default_value = "info")]
    pub log_level: String,

    /// Log line format (text or json)
    #[arg(long, env = "DOCQA_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

impl Args {
    /// Pipeline settings from the arguments, validated.
    pub fn rag_config(&self) -> docqa_rag::Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .splitter(self.splitter)
            .top_k(self.top_k)
            .embedding_model(self.embedding_model.clone())
            .chat_model(self.chat_model.clone())
            .temperature(self.temperature)
            .unit_price(self.unit_price)
            .model_timeout(Duration::from_secs(self.timeout_secs))
            .build()
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig { default_level: self.log_level.clone(), format: self.log_format }
    }

    /// Build the OpenAI-compatible providers.
    pub fn providers(
        &self,
    ) -> docqa_rag::Result<(Arc<dyn EmbeddingProvider>, Arc<dyn LanguageModelProvider>)> {
        let api_key = self.api_key.clone().unwrap_or_default();

        let embedder = OpenAIEmbeddingProvider::new(api_key.clone())?
            .with_base_url(self.base_url.clone())
            .with_model(self.embedding_model.clone());
        let embedder = match self.embedding_dimensions {
            Some(dims) => embedder.with_dimensions(dims),
            None => embedder.with_native_dimensions(native_dimensions(&self.embedding_model)),
        };

        let chat = OpenAIChatModel::new(api_key)?.with_base_url(self.base_url.clone());
        Ok((Arc::new(embedder), Arc::new(chat)))
    }
}

/// Output size of the known OpenAI embedding models.
fn native_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}
