//! End-to-end pipeline tests: ingest, query, persistence, and degradation.

use crate::embeddings::providers::HashProvider;
use crate::engine::{QaEngine, FALLBACK_ANSWER};
use crate::index::{CHUNKS_FILE, VECTORS_FILE};
use lexrag_core::{AppConfig, AppError, AppResult};
use lexrag_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use lexrag_prompt::REFUSAL_ANSWER;
use std::path::Path;
use std::sync::Arc;

/// LLM double that returns a canned answer.
struct MockLlm {
    reply: String,
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        Ok(LlmResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

/// LLM double that always fails, simulating an exhausted provider.
struct FailingLlm;

#[async_trait::async_trait]
impl LlmClient for FailingLlm {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Generation("provider unavailable".to_string()))
    }
}

fn test_config(index_dir: &Path) -> AppConfig {
    AppConfig {
        index_dir: index_dir.to_path_buf(),
        llm_provider: "mock".to_string(),
        llm_model: "mock-model".to_string(),
        ..Default::default()
    }
}

fn engine_with_llm(index_dir: &Path, llm: Arc<dyn LlmClient>) -> QaEngine {
    QaEngine::open(test_config(index_dir), Arc::new(HashProvider::new(384)), llm).unwrap()
}

fn engine(index_dir: &Path) -> QaEngine {
    engine_with_llm(
        index_dir,
        Arc::new(MockLlm {
            reply: "Section 302 prescribes the punishment for murder.".to_string(),
        }),
    )
}

fn write_corpus(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("penal-code.txt");
    std::fs::write(
        &path,
        "Section 302 prescribes the punishment for murder. Whoever commits murder \
         shall be punished with imprisonment for life and shall also be liable to fine. \
         Section 304 addresses culpable homicide not amounting to murder.",
    )
    .unwrap();
    path
}

#[tokio::test]
async fn test_fresh_engine_refuses() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("index"));

    let result = engine.query("What is Section 302?", None).await;

    assert_eq!(result.answer, REFUSAL_ANSWER);
    assert!(result.sources.is_empty());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_ingest_and_query() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("index"));
    let corpus = write_corpus(dir.path());

    let report = engine.ingest(&corpus, None).await.unwrap();
    assert_eq!(report.source_id, "penal-code.txt");
    assert!(report.chunk_count >= 1);
    assert!(report.byte_size > 0);

    let result = engine
        .query("What punishment does Section 302 prescribe for murder?", None)
        .await;

    assert!(result.error.is_none());
    assert_ne!(result.answer, REFUSAL_ANSWER);
    assert!(!result.sources.is_empty());
    assert!(result.sources[0].preview.contains("Section 302"));
    assert_eq!(result.sources[0].source_id, "penal-code.txt");
}

#[tokio::test]
async fn test_irrelevant_query_refuses() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("index"));
    let corpus = write_corpus(dir.path());
    engine.ingest(&corpus, None).await.unwrap();

    let result = engine
        .query("zebra quagga safari photography wildlife birdwatching", None)
        .await;

    assert_eq!(result.answer, REFUSAL_ANSWER);
    assert!(result.sources.is_empty());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_generation_failure_is_absorbed() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_llm(&dir.path().join("index"), Arc::new(FailingLlm));
    let corpus = write_corpus(dir.path());
    engine.ingest(&corpus, None).await.unwrap();

    let result = engine
        .query("What punishment does Section 302 prescribe for murder?", None)
        .await;

    assert_eq!(result.answer, FALLBACK_ANSWER);
    assert!(result.sources.is_empty());
    let error = result.error.expect("error field must be set");
    assert!(error.contains("provider unavailable"));
}

#[tokio::test]
async fn test_reingest_adds_distinct_batch() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("index"));
    let corpus = write_corpus(dir.path());

    let first = engine.ingest(&corpus, None).await.unwrap();
    let second = engine.ingest(&corpus, None).await.unwrap();

    assert_ne!(first.batch_id, second.batch_id);
    assert_eq!(first.chunk_count, second.chunk_count);

    let stats = engine.stats().await;
    assert_eq!(stats.chunk_count, first.chunk_count + second.chunk_count);
}

#[tokio::test]
async fn test_persistence_across_engines() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = dir.path().join("index");
    let corpus = write_corpus(dir.path());

    let chunk_count = {
        let first = engine(&index_dir);
        first.ingest(&corpus, None).await.unwrap().chunk_count
    };

    let second = engine(&index_dir);
    let stats = second.stats().await;
    assert!(stats.index_present);
    assert_eq!(stats.chunk_count, chunk_count);
    assert!(stats.load_warning.is_none());

    let result = second
        .query("What punishment does Section 302 prescribe for murder?", None)
        .await;
    assert!(result.error.is_none());
    assert!(!result.sources.is_empty());
}

#[tokio::test]
async fn test_corrupt_index_degrades_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = dir.path().join("index");
    std::fs::create_dir_all(&index_dir).unwrap();
    std::fs::write(index_dir.join(VECTORS_FILE), b"garbage").unwrap();
    std::fs::write(index_dir.join(CHUNKS_FILE), b"also garbage").unwrap();

    let engine = engine(&index_dir);
    assert!(engine.load_warning().is_some());

    let stats = engine.stats().await;
    assert!(!stats.index_present);
    assert_eq!(stats.chunk_count, 0);

    let result = engine.query("anything", None).await;
    assert_eq!(result.answer, REFUSAL_ANSWER);

    // The next successful ingest rewrites the corrupt artifacts
    let corpus = write_corpus(dir.path());
    engine.ingest(&corpus, None).await.unwrap();

    let reopened = self::engine(&index_dir);
    assert!(reopened.load_warning().is_none());
    assert!(reopened.stats().await.index_present);
}

#[tokio::test]
async fn test_unsupported_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("index"));

    let path = dir.path().join("binary.exe");
    std::fs::write(&path, b"MZ").unwrap();

    let result = engine.ingest(&path, None).await;
    assert!(matches!(result, Err(AppError::UnsupportedFormat(_))));

    // A failed ingest leaves no index behind
    assert!(!engine.stats().await.index_present);
}

#[tokio::test]
async fn test_ingest_dir_continues_past_failures() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("index"));

    let docs = dir.path().join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    std::fs::write(docs.join("good.txt"), "The tenant shall pay rent monthly.").unwrap();
    std::fs::write(docs.join("empty.txt"), "   ").unwrap();

    let report = engine.ingest_dir(&docs).await.unwrap();

    assert_eq!(report.ingested.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].path.ends_with("empty.txt"));
    assert!(report.total_bytes > 0);
}

#[tokio::test]
async fn test_top_k_override_bounds_sources() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("index"));

    let path = dir.path().join("clauses.txt");
    let text = (0..8)
        .map(|i| format!("Arbitration clause {} binds the parties to arbitration. ", i))
        .collect::<String>();
    std::fs::write(&path, text).unwrap();
    engine.ingest(&path, None).await.unwrap();

    let result = engine
        .query("which arbitration clause binds the parties", Some(1))
        .await;

    assert!(result.sources.len() <= 1);
}

#[tokio::test]
async fn test_conversation_log_records_queries() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("index"));

    assert_eq!(engine.stats().await.conversation_len, 0);

    engine.query("first question", None).await;
    engine.query("second question", None).await;

    // Each query appends a question and an answer
    assert_eq!(engine.stats().await.conversation_len, 4);
}

#[tokio::test]
async fn test_stats_reports_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("index"));

    let stats = engine.stats().await;
    assert_eq!(stats.embedding_provider, "hash");
    assert_eq!(stats.embedding_model, "sentence-hash-v1");
    assert_eq!(stats.llm_provider, "mock");
    assert_eq!(stats.chunk_size, 1000);
    assert_eq!(stats.chunk_overlap, 200);
    assert_eq!(stats.top_k, 5);
}
