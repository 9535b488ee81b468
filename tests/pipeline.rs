//! End-to-end pipeline tests: corpus files on disk, delta ingestion into
//! an index, and question answering, with the remote services replaced by
//! deterministic fakes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc;

use docrag::answer::AnswerModel;
use docrag::chat::{ChatEngine, ChatEvent, NO_MATCH_ANSWER};
use docrag::config::{ChunkingConfig, CorpusConfig};
use docrag::embedding::EmbeddingClient;
use docrag::index::{MemoryIndex, SqliteIndex, VectorIndex};
use docrag::ingest::run_ingest;
use docrag::models::ChunkRecord;
use docrag::Result;

/// Deterministic fake embedder: a tiny bag-of-bytes vector, so identical
/// text always maps to an identical vector and similar text lands nearby.
struct FakeEmbedder {
    calls: AtomicUsize,
}

impl FakeEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 8];
                for (i, b) in t.bytes().enumerate() {
                    v[i % 8] += b as f32 / 255.0;
                }
                v
            })
            .collect())
    }
}

struct EchoModel;

#[async_trait::async_trait]
impl AnswerModel for EchoModel {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok("grounded answer".to_string())
    }

    async fn stream(&self, _prompt: &str, sink: mpsc::Sender<String>) -> Result<()> {
        for token in ["grounded", " ", "answer"] {
            if sink.send(token.to_string()).await.is_err() {
                return Ok(());
            }
        }
        Ok(())
    }
}

fn corpus_config(root: PathBuf) -> CorpusConfig {
    CorpusConfig {
        root,
        include_globs: vec!["**/*.md".to_string(), "**/*.txt".to_string()],
        exclude_globs: vec![],
        follow_symlinks: false,
    }
}

fn chunking() -> ChunkingConfig {
    ChunkingConfig {
        chunk_size: 200,
        overlap: 40,
    }
}

fn write_corpus(tmp: &TempDir) {
    std::fs::write(
        tmp.path().join("deploy.md"),
        "# Deployment\n\nDeployments run through the staging pipeline first. \
         Production rollouts require a green staging run and an approval.",
    )
    .unwrap();
    std::fs::write(
        tmp.path().join("oncall.md"),
        "# On-call\n\nThe on-call engineer carries the pager for one week. \
         Escalation goes to the secondary after fifteen minutes.",
    )
    .unwrap();
}

#[tokio::test]
async fn ingest_then_edit_then_delete_lifecycle() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp);
    let corpus = corpus_config(tmp.path().to_path_buf());
    let index = MemoryIndex::new();

    // Fresh ingest creates both documents.
    let embedder = FakeEmbedder::new();
    let outcome = run_ingest(&corpus, &chunking(), &embedder, &index).await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.files_total, 2);
    assert_eq!(outcome.created, 2);
    assert!(outcome.chunks_written > 0);

    // Second pass: everything skipped, zero embedding calls.
    let embedder = FakeEmbedder::new();
    let outcome = run_ingest(&corpus, &chunking(), &embedder, &index).await;
    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

    // Edit one file: exactly that document is rewritten.
    std::fs::write(
        tmp.path().join("oncall.md"),
        "# On-call\n\nThe rotation is now two weeks long.",
    )
    .unwrap();
    let embedder = FakeEmbedder::new();
    let outcome = run_ingest(&corpus, &chunking(), &embedder, &index).await;
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.skipped, 1);

    // Remove a file: its records vanish and the outcome names it.
    std::fs::remove_file(tmp.path().join("deploy.md")).unwrap();
    let outcome = run_ingest(&corpus, &chunking(), &FakeEmbedder::new(), &index).await;
    assert!(outcome.success);
    assert_eq!(outcome.deleted_sources, vec!["deploy.md".to_string()]);
    assert!(outcome.message.contains("1 vanished source(s) removed"));
    let metas = index.metadata_snapshot().await.unwrap();
    assert!(metas.iter().all(|m| m.source == "oncall.md"));
}

#[tokio::test]
async fn empty_corpus_reports_nothing_to_do() {
    let tmp = TempDir::new().unwrap();
    let corpus = corpus_config(tmp.path().to_path_buf());
    let outcome = run_ingest(&corpus, &chunking(), &FakeEmbedder::new(), &MemoryIndex::new()).await;
    assert!(outcome.success);
    assert_eq!(outcome.files_total, 0);
    assert!(outcome.message.contains("nothing to ingest"));
}

#[tokio::test]
async fn ask_answers_from_ingested_corpus() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp);
    let corpus = corpus_config(tmp.path().to_path_buf());

    let index = Arc::new(MemoryIndex::new());
    let embedder = Arc::new(FakeEmbedder::new());
    run_ingest(&corpus, &chunking(), embedder.as_ref(), index.as_ref()).await;

    let engine = ChatEngine::new(
        embedder,
        index,
        Arc::new(EchoModel),
        4,
    );

    let result = engine.ask("who carries the pager?").await.unwrap();
    assert_eq!(result.answer, "grounded answer");
    assert!(!result.references.is_empty());

    // References point at ingested sources.
    for r in &result.references {
        assert!(r.source.ends_with(".md"));
    }
}

#[tokio::test]
async fn streaming_ask_ends_with_references_then_done() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp);
    let corpus = corpus_config(tmp.path().to_path_buf());

    let index = Arc::new(MemoryIndex::new());
    let embedder = Arc::new(FakeEmbedder::new());
    run_ingest(&corpus, &chunking(), embedder.as_ref(), index.as_ref()).await;

    let engine = ChatEngine::new(embedder, index, Arc::new(EchoModel), 4);
    let mut rx = engine.ask_stream("how do deployments work?");

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let token_count = events
        .iter()
        .take_while(|e| matches!(e, ChatEvent::Token(_)))
        .count();
    assert_eq!(token_count, 3);
    assert!(matches!(events[token_count], ChatEvent::References(_)));
    assert_eq!(events[token_count + 1], ChatEvent::Done);
    assert_eq!(events.len(), token_count + 2);
}

#[tokio::test]
async fn ask_against_unindexed_corpus_uses_fallback() {
    let engine = ChatEngine::new(
        Arc::new(FakeEmbedder::new()),
        Arc::new(MemoryIndex::new()),
        Arc::new(EchoModel),
        4,
    );
    let result = engine.ask("anything?").await.unwrap();
    assert_eq!(result.answer, NO_MATCH_ANSWER);
    assert!(result.references.is_empty());
}

#[tokio::test]
async fn sqlite_index_persists_across_connections() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("data").join("index.sqlite");

    {
        let index = SqliteIndex::connect(&db_path).await.unwrap();
        index
            .upsert(vec![
                ChunkRecord {
                    id: "s1:0".to_string(),
                    source: "s1.md".to_string(),
                    chunk_index: 0,
                    file_hash: "h1".to_string(),
                    text: "first".to_string(),
                    vector: vec![1.0, 0.0, 0.0],
                },
                ChunkRecord {
                    id: "s2:0".to_string(),
                    source: "s2.md".to_string(),
                    chunk_index: 0,
                    file_hash: "h2".to_string(),
                    text: "second".to_string(),
                    vector: vec![0.0, 1.0, 0.0],
                },
            ])
            .await
            .unwrap();
        index.close().await;
    }

    let index = SqliteIndex::connect(&db_path).await.unwrap();

    let metas = index.metadata_snapshot().await.unwrap();
    assert_eq!(metas.len(), 2);

    let hits = index.query(&[1.0, 0.0, 0.0], 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source, "s1.md");
    assert!(hits[0].distance < 0.01);

    // Upsert with the same id overwrites instead of duplicating.
    index
        .upsert(vec![ChunkRecord {
            id: "s1:0".to_string(),
            source: "s1.md".to_string(),
            chunk_index: 0,
            file_hash: "h1b".to_string(),
            text: "first, edited".to_string(),
            vector: vec![0.5, 0.5, 0.0],
        }])
        .await
        .unwrap();
    let metas = index.metadata_snapshot().await.unwrap();
    assert_eq!(metas.len(), 2);
    assert!(metas.iter().any(|m| m.file_hash == "h1b"));

    index.delete_source("s1.md").await.unwrap();
    let metas = index.metadata_snapshot().await.unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0].source, "s2.md");

    index.close().await;
}
