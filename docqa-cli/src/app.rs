//! Interactive session state shared by the REPL and one-shot mode.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use docqa_rag::{
    AnswerEngine, EmbeddingProvider, IngestPipeline, LanguageModelProvider, RagConfig, RagError,
    Session,
};
use tracing::{info, warn};

use crate::commands::{Command, HELP};
use crate::interrupt::Interrupt;

/// What the REPL should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn LanguageModelProvider>,
    session: Session,
    max_cost: Option<f64>,
    document: Option<PathBuf>,
    interrupt: Arc<Interrupt>,
}

impl App {
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModelProvider>,
    ) -> Self {
        Self {
            config,
            embedder,
            model,
            session: Session::new(),
            max_cost: None,
            document: None,
            interrupt: Arc::new(Interrupt::new()),
        }
    }

    /// Refuse to embed documents estimated to cost more than `max_cost` USD.
    pub fn with_max_cost(mut self, max_cost: Option<f64>) -> Self {
        self.max_cost = max_cost;
        self
    }

    /// Firing this cancels the load or question in progress.
    pub fn interrupt(&self) -> Arc<Interrupt> {
        Arc::clone(&self.interrupt)
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The currently indexed document, if any.
    pub fn document(&self) -> Option<&Path> {
        self.document.as_deref()
    }

    /// Load, price and index `path`, replacing the current document.
    ///
    /// An interrupt while embedding cancels the build and keeps the
    /// previous document.
    pub async fn load(&mut self, path: &Path, out: &mut impl Write) -> anyhow::Result<()> {
        let pipeline = IngestPipeline::builder()
            .config(self.config.clone())
            .embedding_provider(self.embedder.clone())
            .build()?;

        let prepared = pipeline
            .prepare(path)
            .await
            .with_context(|| format!("could not load {}", path.display()))?;
        writeln!(
            out,
            "{}: {} segments, {} chunks, estimated embedding cost {}",
            prepared.source,
            prepared.segment_count,
            prepared.chunks.len(),
            prepared.estimate
        )?;

        let cost = prepared.estimate.estimated_cost;
        if let Some(limit) = self.max_cost.filter(|limit| cost > *limit) {
            bail!("estimated cost ${cost:.4} exceeds the limit of ${limit:.4}; not indexing");
        }

        let cancel = self.interrupt.begin();
        let index = pipeline.build_index(prepared, &cancel).await?;
        info!(source = %path.display(), "document indexed");
        self.session.set_index(Arc::new(index));
        self.document = Some(path.to_path_buf());
        writeln!(out, "Indexed. Ask away.")?;
        Ok(())
    }

    /// Answer a question about the current document and record it.
    ///
    /// An interrupt abandons the question; nothing is recorded.
    pub async fn ask(&mut self, question: &str, out: &mut impl Write) -> anyhow::Result<()> {
        let engine = AnswerEngine::new(self.embedder.clone(), self.model.clone(), &self.config);
        let cancel = self.interrupt.begin();
        let top_k = self.config.top_k;
        let result = tokio::select! {
            result = self.session.ask(&engine, question, top_k) => result,
            _ = cancel.cancelled() => Err(RagError::Cancelled("question cancelled".into())),
        };
        let answer = match result {
            Ok(answer) => answer,
            Err(RagError::NoActiveIndex) => bail!("no document loaded; use :load PATH first"),
            Err(e) => return Err(e.into()),
        };

        writeln!(out, "{}", answer.text)?;
        for (i, source) in answer.sources.iter().enumerate() {
            writeln!(out, "  [{}] {} (score {:.3})", i + 1, source.chunk.metadata, source.score)?;
        }
        Ok(())
    }

    /// Change the chunk size. A loaded document is re-indexed with it.
    pub async fn set_chunk_size(&mut self, chunk_size: usize, out: &mut impl Write) -> anyhow::Result<()> {
        let mut config = self.config.clone();
        config.chunk_size = chunk_size;
        config.validate()?;
        self.config = config;
        self.session.clear_history();
        writeln!(out, "chunk size set to {chunk_size}; history cleared")?;

        if let Some(path) = self.document.clone() {
            if let Err(e) = self.load(&path, out).await {
                // The old index no longer matches the settings.
                warn!(error = %e, "re-indexing failed");
                self.session.reset();
                self.document = None;
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: usize, out: &mut impl Write) -> anyhow::Result<()> {
        let mut config = self.config.clone();
        config.top_k = top_k;
        config.validate()?;
        self.config = config;
        self.session.clear_history();
        writeln!(out, "k set to {top_k}; history cleared")?;
        Ok(())
    }

    pub fn reset(&mut self, out: &mut impl Write) -> anyhow::Result<()> {
        self.session.reset();
        self.document = None;
        writeln!(out, "Session reset.")?;
        Ok(())
    }

    pub fn show_history(&self, out: &mut impl Write) -> anyhow::Result<()> {
        if self.session.history().is_empty() {
            writeln!(out, "No questions answered yet.")?;
        } else {
            writeln!(out, "{}", self.session.transcript())?;
        }
        Ok(())
    }

    pub fn show_config(&self, out: &mut impl Write) -> anyhow::Result<()> {
        writeln!(out, "{}", serde_json::to_string_pretty(&self.config)?)?;
        if let Some(limit) = self.max_cost {
            writeln!(out, "max cost: ${limit:.4}")?;
        }
        match &self.document {
            Some(path) => writeln!(out, "document: {}", path.display())?,
            None => writeln!(out, "document: none")?,
        }
        Ok(())
    }

    /// Run one parsed command.
    pub async fn execute(&mut self, command: Command, out: &mut impl Write) -> anyhow::Result<Flow> {
        match command {
            Command::Load(path) => self.load(&path, out).await?,
            Command::History => self.show_history(out)?,
            Command::Reset => self.reset(out)?,
            Command::SetChunkSize(n) => self.set_chunk_size(n, out).await?,
            Command::SetTopK(n) => self.set_top_k(n, out)?,
            Command::Config => self.show_config(out)?,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Ask(question) => self.ask(&question, out).await?,
            Command::Empty => {}
        }
        Ok(Flow::Continue)
    }
}
