//! Configuration management for the LexRAG pipeline.
//!
//! This module handles loading and merging configuration from multiple
//! sources, in order of increasing precedence:
//! - Built-in defaults
//! - Config file (`lexrag.yaml`)
//! - Environment variables (`LEXRAG_*`)
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Maximum accepted size for a single ingested file (50 MB).
pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where the persisted index artifacts live
    pub index_dir: PathBuf,

    /// Optional config file path
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Chunk size in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Default number of chunks retrieved per query
    pub top_k: usize,

    /// Maximum number of entries retained in the conversation log
    pub conversation_capacity: usize,

    /// Embedding provider ("hash", "ollama")
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Embedding vector dimension
    pub embedding_dim: usize,

    /// LLM provider ("groq", "ollama")
    pub llm_provider: String,

    /// LLM model identifier
    pub llm_model: String,

    /// Sampling temperature for answer generation.
    /// Kept low so answers stay factual rather than creative.
    pub temperature: f32,

    /// API key for providers that require one
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Endpoint override for local providers
    pub endpoint: Option<String>,

    /// Retry policy for external provider calls
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Log level override
    #[serde(skip)]
    pub log_level: Option<String>,

    /// Disable colored output
    #[serde(skip)]
    pub no_color: bool,
}

/// Retry policy for unreliable network boundaries (embedding, LLM).
///
/// Retries are bounded with exponential backoff; there are no unbounded
/// retry loops anywhere in the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts per request
    pub max_attempts: u32,

    /// Initial backoff duration in milliseconds, doubled per attempt
    pub initial_backoff_ms: u64,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            timeout_secs: 30,
        }
    }
}

/// Subset of the config file that can override RAG parameters.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    index_dir: Option<PathBuf>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    top_k: Option<usize>,
    conversation_capacity: Option<usize>,
    embedding: Option<ProviderSection>,
    llm: Option<LlmSection>,
    retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProviderSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    endpoint: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("index"),
            config_file: None,
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            conversation_capacity: 1000,
            embedding_provider: "hash".to_string(),
            embedding_model: "sentence-hash-v1".to_string(),
            embedding_dim: 384,
            llm_provider: "groq".to_string(),
            llm_model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.1,
            api_key: None,
            endpoint: None,
            retry: RetryPolicy::default(),
            log_level: None,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config file, and environment.
    ///
    /// Environment variables:
    /// - `LEXRAG_CONFIG`: Path to config file
    /// - `LEXRAG_INDEX_DIR`: Index directory
    /// - `LEXRAG_EMBEDDING_PROVIDER` / `LEXRAG_EMBEDDING_MODEL`
    /// - `LEXRAG_LLM_PROVIDER` / `LEXRAG_LLM_MODEL`
    /// - `LEXRAG_API_KEY`: Provider API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(config_file) = std::env::var("LEXRAG_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Load from YAML config file if it exists
        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("lexrag.yaml"));

        if config_path.exists() {
            config.merge_yaml(&config_path)?;
        }

        // Environment variables override the file
        if let Ok(dir) = std::env::var("LEXRAG_INDEX_DIR") {
            config.index_dir = PathBuf::from(dir);
        }
        if let Ok(provider) = std::env::var("LEXRAG_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }
        if let Ok(model) = std::env::var("LEXRAG_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(provider) = std::env::var("LEXRAG_LLM_PROVIDER") {
            config.llm_provider = provider;
        }
        if let Ok(model) = std::env::var("LEXRAG_LLM_MODEL") {
            config.llm_model = model;
        }

        config.api_key = std::env::var("LEXRAG_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(index_dir) = file.index_dir {
            self.index_dir = index_dir;
        }
        if let Some(chunk_size) = file.chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(chunk_overlap) = file.chunk_overlap {
            self.chunk_overlap = chunk_overlap;
        }
        if let Some(top_k) = file.top_k {
            self.top_k = top_k;
        }
        if let Some(capacity) = file.conversation_capacity {
            self.conversation_capacity = capacity;
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding_provider = provider;
            }
            if let Some(model) = embedding.model {
                self.embedding_model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                self.embedding_dim = dimensions;
            }
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                self.llm_provider = provider;
            }
            if let Some(model) = llm.model {
                self.llm_model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.temperature = temperature;
            }
            if let Some(endpoint) = llm.endpoint {
                self.endpoint = Some(endpoint);
            }
        }

        if let Some(retry) = file.retry {
            self.retry = retry;
        }

        Ok(())
    }

    /// Apply CLI overrides, giving flags precedence over everything else.
    pub fn with_overrides(
        mut self,
        index_dir: Option<PathBuf>,
        top_k: Option<usize>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(index_dir) = index_dir {
            self.index_dir = index_dir;
        }

        if let Some(top_k) = top_k {
            self.top_k = top_k;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose && self.log_level.is_none() {
            self.log_level = Some("debug".to_string());
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".to_string()));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if self.llm_provider == "groq" && self.api_key.is_none() {
            return Err(AppError::Config(
                "Groq provider requires LEXRAG_API_KEY".to_string(),
            ));
        }

        Ok(())
    }

    /// Ensure the index directory exists.
    pub fn ensure_index_dir(&self) -> AppResult<()> {
        if !self.index_dir.exists() {
            std::fs::create_dir_all(&self.index_dir).map_err(|e| {
                AppError::Config(format!("Failed to create index directory: {}", e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.llm_provider, "groq");
        assert_eq!(config.embedding_dim, 384);
    }

    #[test]
    fn test_validate_overlap_bound() {
        let mut config = AppConfig::default();
        config.api_key = Some("key".to_string());
        config.chunk_overlap = 1000;
        assert!(config.validate().is_err());

        config.chunk_overlap = 200;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_groq_requires_key() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.llm_provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden =
            config.with_overrides(Some(PathBuf::from("/tmp/idx")), Some(8), None, true, false);

        assert_eq!(overridden.index_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(overridden.top_k, 8);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexrag.yaml");
        std::fs::write(
            &path,
            "chunk_size: 800\nllm:\n  provider: ollama\n  model: llama3.2\n",
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.merge_yaml(&path).unwrap();

        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.llm_provider, "ollama");
        assert_eq!(config.llm_model, "llama3.2");
        // Untouched fields keep defaults
        assert_eq!(config.chunk_overlap, 200);
    }
}
