//! End-to-end ingestion and question answering with offline providers.

use std::path::PathBuf;
use std::sync::Arc;

use docqa_rag::mock::{HashEmbeddingProvider, MockLanguageModel};
use docqa_rag::{
    AnswerEngine, Chunk, IngestPipeline, RagConfig, RagError, Session, SimilarityIndex, Splitter,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const HANDBOOK: &str = "\
Ferries leave the north pier every hour.

The museum opens at nine and closes at five. Entry is free on Sundays.

Bicycles can be rented next to the station. Helmets are included.";

fn config() -> RagConfig {
    RagConfig::builder()
        .chunk_size(80)
        .chunk_overlap(10)
        .top_k(2)
        .embedding_model("hash-bow")
        .unit_price(0.0004)
        .build()
        .unwrap()
}

fn pipeline(config: RagConfig) -> Arc<IngestPipeline> {
    Arc::new(
        IngestPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(HashEmbeddingProvider::new(128)))
            .build()
            .unwrap(),
    )
}

fn handbook(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("handbook.txt");
    std::fs::write(&path, HANDBOOK).unwrap();
    path
}

#[tokio::test]
async fn prepare_reports_chunks_and_cost_before_embedding() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(config());

    let prepared = pipeline.prepare(&handbook(&dir)).await.unwrap();
    assert_eq!(prepared.segment_count, 1);
    assert!(prepared.chunks.len() > 1);
    assert!(prepared.chunks.iter().all(|c| c.char_len() <= 80));

    let rebuilt: String = prepared.chunks.iter().map(Chunk::fresh_content).collect();
    assert_eq!(rebuilt, HANDBOOK);

    let estimate = prepared.estimate;
    assert!(estimate.total_tokens > 0);
    let expected = estimate.total_tokens as f64 / 1000.0 * 0.0004;
    assert!((estimate.estimated_cost - expected).abs() < 1e-12);
}

#[tokio::test]
async fn ingested_document_answers_questions() {
    let dir = TempDir::new().unwrap();
    let config = config();
    let pipeline = pipeline(config.clone());

    let report = pipeline.ingest(&handbook(&dir), &CancellationToken::new()).await.unwrap();
    assert_eq!(report.source, dir.path().join("handbook.txt").display().to_string());
    assert_eq!(report.index.len(), report.chunk_count);
    assert_eq!(report.index.embedding_model(), "hash-bow");

    let model = Arc::new(MockLanguageModel::replying("At nine."));
    let engine = AnswerEngine::new(pipeline.embedding_provider().clone(), model.clone(), &config);

    let mut session = Session::new();
    session.set_index(report.index.clone());
    let answer = session.ask(&engine, "When does the museum open?", config.top_k).await.unwrap();

    assert_eq!(answer.text, "At nine.");
    assert_eq!(answer.sources.len(), 2);
    assert!(model.requests()[0].prompt.contains("When does the museum open?"));
    assert_eq!(session.history().len(), 1);
    assert!(session.transcript().contains("At nine."));
}

#[tokio::test]
async fn spawned_ingest_completes_in_background() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(config());

    let handle = pipeline.spawn_ingest(handbook(&dir), CancellationToken::new());
    let report = handle.await.unwrap().unwrap();
    assert!(!report.index.is_empty());
}

#[tokio::test]
async fn cancelled_ingest_returns_no_index() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline.spawn_ingest(handbook(&dir), cancel).await.unwrap();
    assert!(matches!(result, Err(RagError::Cancelled(_))));
}

#[tokio::test]
async fn unsupported_file_fails_before_chunking() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("slides.pptx");
    std::fs::write(&path, b"PK").unwrap();

    let result = pipeline(config()).prepare(&path).await;
    assert!(matches!(result, Err(RagError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn fixed_splitter_cuts_exact_windows() {
    let dir = TempDir::new().unwrap();
    let config = RagConfig::builder()
        .chunk_size(50)
        .chunk_overlap(5)
        .splitter(Splitter::Fixed)
        .embedding_model("hash-bow")
        .build()
        .unwrap();

    let prepared = pipeline(config).prepare(&handbook(&dir)).await.unwrap();
    let (last, full) = prepared.chunks.split_last().unwrap();
    assert!(full.iter().all(|c| c.char_len() == 50));
    assert!(last.char_len() <= 50);
}

#[test]
fn builder_requires_config_and_embedder() {
    let missing_config = IngestPipeline::builder()
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(8)))
        .build();
    assert!(matches!(missing_config, Err(RagError::InvalidConfiguration(_))));

    let missing_embedder = IngestPipeline::builder().config(RagConfig::default()).build();
    assert!(matches!(missing_embedder, Err(RagError::InvalidConfiguration(_))));
}
