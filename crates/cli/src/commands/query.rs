//! Query command handler.

use clap::Args;
use lexrag_core::{config::AppConfig, AppResult};

/// Ask a question against the indexed corpus
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command");

        let engine = super::build_engine(config)?;

        let result = engine.query(&self.question, self.top_k).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("Answer:");
            println!("{}", result.answer);
            println!();

            if result.sources.is_empty() {
                println!("Sources: (none)");
            } else {
                println!("Sources:");
                for source in &result.sources {
                    println!(
                        "- {} (page {}, score {:.3})",
                        source.source_id, source.page_number, source.score
                    );
                }
            }

            if let Some(error) = &result.error {
                println!();
                println!("Warning: {}", error);
            }
        }

        Ok(())
    }
}
