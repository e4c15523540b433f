//! Retrieval adapter over the vector index.
//!
//! Thin, stateless layer that resolves raw search hits back to chunk text
//! and metadata for prompt assembly and source attribution.

use crate::index::VectorIndex;
use lexrag_core::AppResult;

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk_id: u64,
    pub source_id: String,
    pub page_number: u32,
    pub text: String,
    pub score: f32,
}

/// Retrieve the top-k chunks for a question vector, in rank order.
pub fn retrieve(
    index: &VectorIndex,
    question_vector: &[f32],
    k: usize,
) -> AppResult<Vec<RetrievedChunk>> {
    let hits = index.search(question_vector, k)?;

    Ok(hits
        .into_iter()
        .map(|(chunk, score)| RetrievedChunk {
            chunk_id: chunk.chunk_id,
            source_id: chunk.source_id,
            page_number: chunk.page_number,
            text: chunk.text,
            score,
        })
        .collect())
}
