//! Per-user session state: the active index and the Q/A transcript.
//!
//! A [`Session`] is plain in-memory state owned by one caller. Mutating
//! methods take `&mut self`, so concurrent use requires the caller to
//! serialise access (e.g. a `tokio::sync::Mutex<Session>`). Separate
//! sessions share nothing.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::answer::{Answer, AnswerEngine};
use crate::error::{RagError, Result};
use crate::index::SimilarityIndex;

/// Width of the rule printed between transcript entries.
const TRANSCRIPT_RULE_WIDTH: usize = 100;

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRecord {
    pub query: String,
    pub answer: String,
    /// Position in the session's history, starting at 0.
    pub timestamp_order: u64,
}

/// An interactive question-answering session.
#[derive(Default)]
pub struct Session {
    index: Option<Arc<dyn SimilarityIndex>>,
    history: Vec<QueryRecord>,
    next_order: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("index_entries", &self.index.as_ref().map(|i| i.len()))
            .field("history", &self.history)
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the active index and the history.
    pub fn reset(&mut self) {
        info!("session reset");
        self.index = None;
        self.clear_history();
    }

    /// Make `index` the active index. The history is cleared, since earlier
    /// answers were grounded in a different document.
    pub fn set_index(&mut self, index: Arc<dyn SimilarityIndex>) {
        info!(entries = index.len(), model = index.embedding_model(), "active index replaced");
        self.index = Some(index);
        self.clear_history();
    }

    /// Clear the history but keep the active index.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.next_order = 0;
    }

    pub fn active_index(&self) -> Option<&Arc<dyn SimilarityIndex>> {
        self.index.as_ref()
    }

    /// Append an answered question to the history.
    ///
    /// Call this only with the output of a successful answer.
    pub fn record_query(&mut self, query: impl Into<String>, answer: impl Into<String>) -> &QueryRecord {
        let record = QueryRecord {
            query: query.into(),
            answer: answer.into(),
            timestamp_order: self.next_order,
        };
        self.next_order += 1;
        debug!(order = record.timestamp_order, "query recorded");
        self.history.push(record);
        &self.history[self.history.len() - 1]
    }

    /// The history in chronological order, oldest first.
    pub fn history(&self) -> &[QueryRecord] {
        &self.history
    }

    /// Answer `query` against the active index and record it on success.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NoActiveIndex`] when no document is indexed, or
    /// whatever [`AnswerEngine::answer`] fails with. Failed questions are
    /// not recorded.
    pub async fn ask(&mut self, engine: &AnswerEngine, query: &str, k: usize) -> Result<Answer> {
        let index = self.index.clone().ok_or(RagError::NoActiveIndex)?;
        let answer = engine.answer(index.as_ref(), query, k).await?;
        self.record_query(query, answer.text.clone());
        Ok(answer)
    }

    /// Render the history newest first, entries separated by a rule.
    pub fn transcript(&self) -> String {
        let rule = "-".repeat(TRANSCRIPT_RULE_WIDTH);
        self.history
            .iter()
            .rev()
            .map(|r| format!("Q: {}\nA: {}", r.query, r.answer))
            .collect::<Vec<_>>()
            .join(&format!("\n{rule}\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryIndex;

    fn empty_index() -> Arc<dyn SimilarityIndex> {
        Arc::new(InMemoryIndex::from_entries("m", Vec::new()).unwrap())
    }

    #[test]
    fn records_in_chronological_order() {
        let mut session = Session::new();
        session.record_query("q1", "a1");
        session.record_query("q2", "a2");
        let orders: Vec<u64> = session.history().iter().map(|r| r.timestamp_order).collect();
        assert_eq!(orders, [0, 1]);
        assert_eq!(session.history()[1].query, "q2");
    }

    #[test]
    fn set_index_clears_history() {
        let mut session = Session::new();
        session.set_index(empty_index());
        session.record_query("q", "a");
        session.set_index(empty_index());
        assert!(session.history().is_empty());
        assert!(session.active_index().is_some());
        assert_eq!(session.record_query("again", "x").timestamp_order, 0);
    }

    #[test]
    fn reset_clears_index_and_history() {
        let mut session = Session::new();
        session.set_index(empty_index());
        session.record_query("q", "a");
        session.reset();
        assert!(session.active_index().is_none());
        assert!(session.history().is_empty());
    }

    #[test]
    fn transcript_is_newest_first() {
        let mut session = Session::new();
        session.record_query("first", "one");
        session.record_query("second", "two");
        let transcript = session.transcript();
        assert!(transcript.starts_with("Q: second\nA: two\n"));
        assert!(transcript.ends_with("Q: first\nA: one"));
        assert!(transcript.contains(&"-".repeat(100)));
    }
}
