//! Engine type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Detect format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "txt",
        }
    }
}

/// One extracted text segment with its page number (1-indexed).
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub page_number: u32,
}

/// A parsed document, immutable and discarded after chunking.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source document name (typically the file name)
    pub source_id: String,

    /// Ingestion batch identifier
    pub batch_id: String,

    /// SHA-256 of the extracted text
    pub content_hash: String,

    /// Ordered text segments with page metadata
    pub segments: Vec<Segment>,
}

/// A bounded, overlapping slice of a document's text, the unit of embedding
/// and retrieval.
///
/// `char_start`/`char_end` are offsets into the document's joined text; the
/// union of all ranges for a document covers the full text without gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk identifier. Batch-local (zero-based) out of the chunker;
    /// rebased to a globally unique id when inserted into the index.
    pub chunk_id: u64,

    /// Source document name
    pub source_id: String,

    /// Originating page (1-indexed)
    pub page_number: u32,

    /// Start offset in the document text (inclusive)
    pub char_start: usize,

    /// End offset in the document text (exclusive)
    pub char_end: usize,

    /// Chunk text
    pub text: String,
}

/// Result of ingesting a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Source document name
    pub source_id: String,

    /// Ingestion batch identifier
    pub batch_id: String,

    /// Number of chunks added to the index
    pub chunk_count: usize,

    /// Size of the ingested file in bytes
    pub byte_size: u64,
}

/// Result of ingesting a directory: per-file outcomes, never aborted by a
/// single file's failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirIngestReport {
    /// Successfully ingested files
    pub ingested: Vec<IngestReport>,

    /// Files that failed, with the failure reason
    pub failed: Vec<FailedFile>,

    /// Total bytes across successfully ingested files
    pub total_bytes: u64,
}

/// A file that could not be ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// A source passage backing an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Bounded-length preview of the chunk text
    pub preview: String,

    /// Source document name
    pub source_id: String,

    /// Originating page
    pub page_number: u32,

    /// Chunk id within the index
    pub chunk_id: u64,

    /// Similarity score for this passage
    pub score: f32,
}

/// Result of a single query. Constructed fresh per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The question as asked
    pub question: String,

    /// Generated answer, refusal sentence, or fallback text
    pub answer: String,

    /// Source passages in retrieval rank order
    pub sources: Vec<SourceRef>,

    /// When the query was answered
    pub timestamp: DateTime<Utc>,

    /// Set when retrieval or generation failed; the answer is then a safe
    /// fallback rather than a grounded response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read-only summary of engine state and configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Whether a populated index is loaded
    pub index_present: bool,

    /// Number of chunks in the index
    pub chunk_count: usize,

    /// Embedding provider and model identifiers
    pub embedding_provider: String,
    pub embedding_model: String,

    /// LLM provider and model identifiers
    pub llm_provider: String,
    pub llm_model: String,

    /// Chunking and retrieval configuration
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,

    /// Number of entries in the conversation log
    pub conversation_len: usize,

    /// Warning recorded if the persisted index failed to load at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_warning: Option<String>,
}
