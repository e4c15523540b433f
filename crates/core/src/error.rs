//! Error types for the LexRAG pipeline.
//!
//! This module defines a unified error enum covering every failure category
//! in the system: document ingestion, index consistency, persistence, and
//! external provider calls. Every fallible function returns
//! `Result<T, AppError>` so call sites handle both outcomes exhaustively.

use thiserror::Error;

/// Unified error type for the LexRAG pipeline.
///
/// Errors raised during ingestion are returned to the caller as typed
/// results. Errors raised during a query are absorbed by the engine into the
/// `QueryResult` error field; nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File extension or declared format is not one we can ingest
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// The underlying parser could not extract text from the file
    #[error("Failed to parse {file}: {reason}")]
    Parse { file: String, reason: String },

    /// Parsing succeeded but produced no usable text
    #[error("Document {0} contains no extractable text")]
    EmptyDocument(String),

    /// Vectors added to the index do not match its dimension
    #[error("Embedding dimension mismatch: index has {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A chunk id collided with one already present in the index
    #[error("Duplicate chunk id in index: {0}")]
    DuplicateChunkId(u64),

    /// Persisted index files exist but could not be read back
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Embedding provider failed after exhausting retries
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Language model provider failed after exhausting retries
    #[error("Generation error: {0}")]
    Generation(String),

    /// Vector search failed
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Prompt assembly errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl AppError {
    /// Whether this error came from an external provider boundary.
    ///
    /// Provider failures degrade a query to a fallback answer instead of
    /// propagating; everything else is a caller-facing ingestion error.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            AppError::Embedding(_) | AppError::Generation(_) | AppError::Retrieval(_)
        )
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
