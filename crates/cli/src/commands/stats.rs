//! Stats command handler.

use clap::Args;
use lexrag_core::{config::AppConfig, AppResult};

/// Show engine statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let engine = super::build_engine(config)?;
        let stats = engine.stats().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Index present: {}", stats.index_present);
            println!("  Chunks: {}", stats.chunk_count);
            println!(
                "  Embedding: {} ({})",
                stats.embedding_provider, stats.embedding_model
            );
            println!("  LLM: {} ({})", stats.llm_provider, stats.llm_model);
            println!(
                "  Chunking: size {}, overlap {}, top-k {}",
                stats.chunk_size, stats.chunk_overlap, stats.top_k
            );
            println!("  Conversation entries: {}", stats.conversation_len);
            if let Some(warning) = &stats.load_warning {
                println!("  Warning: {}", warning);
            }
        }

        Ok(())
    }
}
