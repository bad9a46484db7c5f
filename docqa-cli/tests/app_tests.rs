//! The interactive session driven through parsed commands with offline providers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use docqa_cli::{App, Command, Flow, parse};
use docqa_rag::RagConfig;
use docqa_rag::mock::{HashEmbeddingProvider, MockLanguageModel};
use tempfile::TempDir;

const NOTES: &str = "The lighthouse was built in 1874. It stands on the western cliff.\n\n\
                     The keeper's cottage is now a small museum about shipwrecks.";

fn app(model: MockLanguageModel) -> App {
    let config = RagConfig::builder()
        .chunk_size(60)
        .chunk_overlap(5)
        .embedding_model("hash-bow")
        .build()
        .unwrap();
    App::new(config, Arc::new(HashEmbeddingProvider::new(64)), Arc::new(model))
}

fn notes(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, NOTES).unwrap();
    path
}

async fn run(app: &mut App, line: &str) -> (anyhow::Result<Flow>, String) {
    let mut out = Vec::new();
    let result = app.execute(parse(line).unwrap(), &mut out).await;
    (result, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn load_prints_chunk_count_and_cost() {
    let dir = TempDir::new().unwrap();
    let mut app = app(MockLanguageModel::replying("1874"));

    let (result, out) = run(&mut app, &format!(":load {}", notes(&dir).display())).await;
    result.unwrap();
    assert!(out.contains("chunks"));
    assert!(out.contains("tokens, $"));
    assert!(app.document().is_some());
}

#[tokio::test]
async fn question_before_load_is_rejected_without_history() {
    let mut app = app(MockLanguageModel::replying("unused"));
    let (result, _) = run(&mut app, "When was it built?").await;
    assert!(result.unwrap_err().to_string().contains(":load"));
    assert!(app.session().history().is_empty());
}

#[tokio::test]
async fn answers_are_printed_and_recorded() {
    let dir = TempDir::new().unwrap();
    let mut app = app(MockLanguageModel::replying("In 1874."));
    app.load(&notes(&dir), &mut Vec::new()).await.unwrap();

    let (result, out) = run(&mut app, "When was the lighthouse built?").await;
    assert_eq!(result.unwrap(), Flow::Continue);
    assert!(out.starts_with("In 1874.\n"));
    assert!(out.contains("[1] notes.txt"));

    let (_, history) = run(&mut app, ":history").await;
    assert!(history.contains("Q: When was the lighthouse built?"));
    assert!(history.contains("A: In 1874."));
}

#[tokio::test]
async fn changing_k_or_chunk_size_clears_history() {
    let dir = TempDir::new().unwrap();
    let mut app = app(MockLanguageModel::replying("ok"));
    app.load(&notes(&dir), &mut Vec::new()).await.unwrap();

    run(&mut app, "first?").await.0.unwrap();
    run(&mut app, ":set k 1").await.0.unwrap();
    assert!(app.session().history().is_empty());
    assert_eq!(app.config().top_k, 1);

    run(&mut app, "second?").await.0.unwrap();
    let (result, out) = run(&mut app, ":set chunk-size 40").await;
    result.unwrap();
    assert!(out.contains("chunks"));
    assert!(app.session().history().is_empty());
    assert_eq!(app.config().chunk_size, 40);
    assert!(app.session().active_index().is_some());
}

#[tokio::test]
async fn chunk_size_not_above_overlap_is_rejected() {
    let mut app = app(MockLanguageModel::replying("ok"));
    let (result, _) = run(&mut app, ":set chunk-size 5").await;
    assert!(result.is_err());
    assert_eq!(app.config().chunk_size, 60);
}

#[tokio::test]
async fn max_cost_blocks_indexing() {
    let dir = TempDir::new().unwrap();
    let mut app = app(MockLanguageModel::replying("ok")).with_max_cost(Some(0.0));

    let mut out = Vec::new();
    let err = app.load(&notes(&dir), &mut out).await.unwrap_err();
    assert!(err.to_string().contains("exceeds the limit"));
    assert!(app.session().active_index().is_none());
}

#[tokio::test]
async fn reset_forgets_document_and_quit_stops() {
    let dir = TempDir::new().unwrap();
    let mut app = app(MockLanguageModel::replying("ok"));
    app.load(&notes(&dir), &mut Vec::new()).await.unwrap();
    run(&mut app, "anything?").await.0.unwrap();

    run(&mut app, ":reset").await.0.unwrap();
    assert!(app.document().is_none());
    assert!(app.session().history().is_empty());
    assert!(app.session().active_index().is_none());

    let mut out = Vec::new();
    assert_eq!(app.execute(Command::Quit, &mut out).await.unwrap(), Flow::Quit);
}

#[tokio::test]
async fn config_is_shown_as_json() {
    let mut app = app(MockLanguageModel::replying("ok"));
    let (result, out) = run(&mut app, ":config").await;
    result.unwrap();
    assert!(out.contains("\"chunk_size\": 60"));
    assert!(out.contains("document: none"));
}

#[tokio::test(start_paused = true)]
async fn interrupt_abandons_a_slow_question() {
    let dir = TempDir::new().unwrap();
    let mut app = app(MockLanguageModel::delayed(Duration::from_secs(30), "too late"));
    app.load(&notes(&dir), &mut Vec::new()).await.unwrap();

    let interrupt = app.interrupt();
    let firing = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        interrupt.fire();
    });

    let started = tokio::time::Instant::now();
    let err = app.ask("When was it built?", &mut Vec::new()).await.unwrap_err();
    assert!(err.to_string().contains("Cancelled"));
    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(app.session().history().is_empty());
    firing.await.unwrap();
}

#[tokio::test]
async fn interrupt_between_operations_does_not_cancel_the_next_one() {
    let dir = TempDir::new().unwrap();
    let mut app = app(MockLanguageModel::replying("ok"));
    app.interrupt().fire();
    app.load(&notes(&dir), &mut Vec::new()).await.unwrap();
    app.ask("anything?", &mut Vec::new()).await.unwrap();
}
