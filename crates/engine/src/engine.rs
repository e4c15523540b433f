//! QA engine orchestration.
//!
//! Owns the vector index lifecycle and wires the pipeline together:
//! ingestion (load, chunk, embed, index, save) and querying (retrieve,
//! prompt, generate). Constructed once at process start and passed by
//! handle; there is no hidden module-level state.
//!
//! Concurrency: index mutation holds an exclusive write lock for the full
//! load-modify-save cycle. Queries take a snapshot under a read lock and
//! complete against that snapshot even if a concurrent ingest swaps the
//! index underneath them.

use crate::chunker;
use crate::conversation::{ConversationLog, Role};
use crate::embeddings::EmbeddingProvider;
use crate::index::{IndexFile, VectorIndex};
use crate::loader;
use crate::retriever;
use crate::types::{
    DirIngestReport, DocumentFormat, EngineStats, FailedFile, IngestReport, QueryResult, SourceRef,
};
use chrono::Utc;
use lexrag_core::{AppConfig, AppError, AppResult};
use lexrag_llm::{LlmClient, LlmRequest};
use lexrag_prompt::{build_prompt, ContextBlock, REFUSAL_ANSWER};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use walkdir::WalkDir;

/// Safe answer returned when retrieval or generation fails mid-query.
pub const FALLBACK_ANSWER: &str =
    "I apologize, but I encountered an error processing your question. Please try again.";

/// Minimum similarity score for a chunk to count as relevant context.
/// Chunks below this are dropped; a query whose retrieved context is all
/// below it short-circuits to the refusal answer without calling the LLM.
pub const MIN_RELEVANCE_SCORE: f32 = 0.20;

/// Maximum length of a source preview in the query result.
const PREVIEW_LENGTH: usize = 200;

/// Upper bound on generated answer tokens.
const MAX_ANSWER_TOKENS: u32 = 1024;

/// The question-answering engine.
pub struct QaEngine {
    config: AppConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    index: RwLock<Arc<VectorIndex>>,
    conversation: std::sync::Mutex<ConversationLog>,
    load_warning: Option<String>,
}

impl QaEngine {
    /// Open the engine, loading any persisted index.
    ///
    /// A missing index is not an error: the engine starts READY with an
    /// empty index and queries answer with the refusal sentence until an
    /// ingest occurs. A corrupt index is surfaced as a warning (visible in
    /// `stats()`), treated as absent, and rewritten by the next successful
    /// ingest.
    pub fn open(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        let (index, load_warning) = match VectorIndex::load(&config.index_dir) {
            Ok(IndexFile::Present(index)) => (index, None),
            Ok(IndexFile::Absent) => {
                tracing::info!("No persisted index at {:?}, starting empty", config.index_dir);
                (VectorIndex::new(), None)
            }
            Err(e) => {
                let warning = format!("Persisted index could not be loaded: {}", e);
                tracing::warn!("{}; continuing with an empty index", warning);
                (VectorIndex::new(), Some(warning))
            }
        };

        let conversation = ConversationLog::new(config.conversation_capacity);

        tracing::info!(
            "QA engine ready ({} chunks, embedding: {}/{}, llm: {}/{})",
            index.len(),
            embedder.provider_name(),
            embedder.model_name(),
            llm.provider_name(),
            config.llm_model
        );

        Ok(Self {
            config,
            embedder,
            llm,
            index: RwLock::new(Arc::new(index)),
            conversation: std::sync::Mutex::new(conversation),
            load_warning,
        })
    }

    /// Ingest a single file into the index.
    ///
    /// The persisted index is only replaced after a successful save; a
    /// failure at any earlier step leaves both the in-memory and on-disk
    /// index untouched.
    pub async fn ingest(
        &self,
        path: &Path,
        declared: Option<DocumentFormat>,
    ) -> AppResult<IngestReport> {
        let byte_size = loader::validate_file(path, declared)?;

        let batch_id = uuid::Uuid::new_v4().to_string();
        let document = loader::load_document(path, declared, &batch_id)?;
        let source_id = document.source_id.clone();

        let chunks = chunker::chunk_document(
            &document,
            self.config.chunk_size,
            self.config.chunk_overlap,
        );
        if chunks.is_empty() {
            return Err(AppError::EmptyDocument(source_id));
        }

        // Embedding happens outside the index lock; only the
        // load-modify-save cycle below is exclusive.
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let chunk_count = chunks.len();

        {
            let mut guard = self.index.write().await;

            let mut rebuilt = (**guard).clone();
            let base = rebuilt.next_chunk_id();

            let rebased: Vec<_> = chunks
                .into_iter()
                .map(|mut chunk| {
                    chunk.chunk_id += base;
                    chunk
                })
                .collect();

            rebuilt.add(rebased, vectors)?;
            rebuilt.save(&self.config.index_dir)?;

            *guard = Arc::new(rebuilt);
        }

        tracing::info!(
            "Ingested {} ({} chunks, {} bytes, batch {})",
            source_id,
            chunk_count,
            byte_size,
            batch_id
        );

        Ok(IngestReport {
            source_id,
            batch_id,
            chunk_count,
            byte_size,
        })
    }

    /// Ingest every supported file under a directory.
    ///
    /// A failing file is recorded and skipped; it never aborts the rest of
    /// the batch.
    pub async fn ingest_dir(&self, dir: &Path) -> AppResult<DirIngestReport> {
        if !dir.is_dir() {
            return Err(AppError::Config(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        let mut report = DirIngestReport::default();

        for entry in WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || loader::resolve_format(path, None).is_err() {
                continue;
            }

            match self.ingest(path, None).await {
                Ok(file_report) => {
                    report.total_bytes += file_report.byte_size;
                    report.ingested.push(file_report);
                }
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", path, e);
                    report.failed.push(FailedFile {
                        path: path.to_path_buf(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Directory ingestion complete: {} files ingested, {} failed",
            report.ingested.len(),
            report.failed.len()
        );

        Ok(report)
    }

    /// Answer a question against the indexed corpus.
    ///
    /// Never raises: provider failures become a fallback answer with the
    /// error recorded in the result, and an empty index short-circuits to
    /// the refusal answer without any provider call.
    pub async fn query(&self, question: &str, k: Option<usize>) -> QueryResult {
        let k = k.unwrap_or(self.config.top_k).max(1);

        tracing::info!("Query (top-{}): {}", k, question);
        self.log_entry(Role::Question, question);

        // Snapshot the index; a concurrent ingest swapping it does not
        // affect this query.
        let snapshot = { self.index.read().await.clone() };

        if snapshot.is_empty() {
            tracing::info!("Index is empty, answering with refusal");
            self.log_entry(Role::Answer, REFUSAL_ANSWER);
            return QueryResult {
                question: question.to_string(),
                answer: REFUSAL_ANSWER.to_string(),
                sources: Vec::new(),
                timestamp: Utc::now(),
                error: None,
            };
        }

        match self.answer(question, k, &snapshot).await {
            Ok((answer, sources)) => {
                self.log_entry(Role::Answer, &answer);
                QueryResult {
                    question: question.to_string(),
                    answer,
                    sources,
                    timestamp: Utc::now(),
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("Query failed: {}", e);
                self.log_entry(Role::Answer, FALLBACK_ANSWER);
                QueryResult {
                    question: question.to_string(),
                    answer: FALLBACK_ANSWER.to_string(),
                    sources: Vec::new(),
                    timestamp: Utc::now(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Retrieval + generation path for a non-empty index.
    async fn answer(
        &self,
        question: &str,
        k: usize,
        snapshot: &VectorIndex,
    ) -> AppResult<(String, Vec<SourceRef>)> {
        let question_vector = self.embedder.embed(question).await?;

        let retrieved = retriever::retrieve(snapshot, &question_vector, k)?;
        let relevant: Vec<_> = retrieved
            .into_iter()
            .filter(|r| r.score >= MIN_RELEVANCE_SCORE)
            .collect();

        if relevant.is_empty() {
            tracing::info!(
                "No chunk scored above {:.2}, answering with refusal",
                MIN_RELEVANCE_SCORE
            );
            return Ok((REFUSAL_ANSWER.to_string(), Vec::new()));
        }

        tracing::debug!(
            "Retrieved {} relevant chunks (top score {:.3})",
            relevant.len(),
            relevant[0].score
        );

        let blocks: Vec<ContextBlock> = relevant
            .iter()
            .map(|r| ContextBlock {
                source: r.source_id.clone(),
                page: r.page_number,
                text: r.text.clone(),
            })
            .collect();

        let prompt = build_prompt(question, &blocks)?;

        let request = LlmRequest::new(prompt.user, self.config.llm_model.clone())
            .with_system(prompt.system)
            .with_temperature(self.config.temperature)
            .with_max_tokens(MAX_ANSWER_TOKENS);

        let response = self.llm.complete(&request).await?;

        let sources = relevant
            .iter()
            .map(|r| SourceRef {
                preview: preview(&r.text),
                source_id: r.source_id.clone(),
                page_number: r.page_number,
                chunk_id: r.chunk_id,
                score: r.score,
            })
            .collect();

        Ok((response.content, sources))
    }

    /// Read-only summary of engine state and configuration.
    pub async fn stats(&self) -> EngineStats {
        let snapshot = { self.index.read().await.clone() };
        let conversation_len = self.conversation.lock().unwrap().len();

        EngineStats {
            index_present: !snapshot.is_empty(),
            chunk_count: snapshot.len(),
            embedding_provider: self.embedder.provider_name().to_string(),
            embedding_model: self.embedder.model_name().to_string(),
            llm_provider: self.llm.provider_name().to_string(),
            llm_model: self.config.llm_model.clone(),
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            top_k: self.config.top_k,
            conversation_len,
            load_warning: self.load_warning.clone(),
        }
    }

    /// Warning recorded if the persisted index failed to load at startup.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    fn log_entry(&self, role: Role, content: &str) {
        self.conversation.lock().unwrap().append(role, content);
    }
}

/// Bounded-length, char-boundary-safe preview of chunk text.
fn preview(text: &str) -> String {
    if text.len() <= PREVIEW_LENGTH {
        return text.to_string();
    }

    let mut end = PREVIEW_LENGTH;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(500);
        let p = preview(&long);
        assert_eq!(p.len(), PREVIEW_LENGTH + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_preview_utf8_boundary() {
        let text = "é".repeat(300);
        let p = preview(&text);
        assert!(p.ends_with("..."));
        assert!(p.len() <= PREVIEW_LENGTH + 3);
    }
}
