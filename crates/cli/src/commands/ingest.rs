//! Ingest command handler.

use clap::Args;
use lexrag_core::{config::AppConfig, AppResult};
use lexrag_engine::DocumentFormat;
use std::path::PathBuf;

/// Ingest documents into the index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Declared format override (pdf, docx, txt); otherwise sniffed from
    /// the file extension
    #[arg(long)]
    pub format: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {} paths", self.paths.len());

        let declared = match self.format.as_deref() {
            Some(tag) => Some(DocumentFormat::from_extension(tag).ok_or_else(|| {
                lexrag_core::AppError::UnsupportedFormat(tag.to_string())
            })?),
            None => None,
        };

        let engine = super::build_engine(config)?;

        let mut ingested = Vec::new();
        let mut failed = Vec::new();

        for path in &self.paths {
            if path.is_dir() {
                let report = engine.ingest_dir(path).await?;
                ingested.extend(report.ingested);
                failed.extend(report.failed);
            } else {
                match engine.ingest(path, declared).await {
                    Ok(report) => ingested.push(report),
                    Err(e) => failed.push(lexrag_engine::types::FailedFile {
                        path: path.clone(),
                        error: e.to_string(),
                    }),
                }
            }
        }

        if self.json {
            let output = serde_json::json!({
                "ingested": ingested,
                "failed": failed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            for report in &ingested {
                println!(
                    "Ingested {} ({} chunks, {} bytes)",
                    report.source_id, report.chunk_count, report.byte_size
                );
            }
            for failure in &failed {
                println!("Failed {}: {}", failure.path.display(), failure.error);
            }
            println!(
                "Done: {} ingested, {} failed",
                ingested.len(),
                failed.len()
            );
        }

        Ok(())
    }
}
