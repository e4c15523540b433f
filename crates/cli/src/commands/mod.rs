//! Command handlers for the LexRAG CLI.

mod ingest;
mod query;
mod stats;

pub use ingest::IngestCommand;
pub use query::QueryCommand;
pub use stats::StatsCommand;

use lexrag_core::{config::AppConfig, AppResult};
use lexrag_engine::embeddings::create_provider;
use lexrag_engine::QaEngine;
use lexrag_llm::create_client;

/// Build the QA engine from configuration.
///
/// Providers are constructed here, at the service edge, and handed to the
/// engine already configured; the engine itself never touches secrets.
pub fn build_engine(config: &AppConfig) -> AppResult<QaEngine> {
    config.validate()?;
    config.ensure_index_dir()?;

    let embedder = create_provider(
        &config.embedding_provider,
        &config.embedding_model,
        config.embedding_dim,
        config.endpoint.as_deref(),
        config.retry,
    )?;

    let llm = create_client(
        &config.llm_provider,
        config.endpoint.as_deref(),
        config.api_key.as_deref(),
        config.retry,
    )?;

    QaEngine::open(config.clone(), embedder, llm)
}
