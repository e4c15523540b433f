//! Tests for retrieval ranking correctness with content-derived embeddings.

use crate::embeddings::providers::HashProvider;
use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::retriever;
use crate::types::Chunk;

fn chunk(id: u64, text: &str) -> Chunk {
    Chunk {
        chunk_id: id,
        source_id: "corpus.txt".to_string(),
        page_number: 1,
        char_start: 0,
        char_end: text.len(),
        text: text.to_string(),
    }
}

async fn index_of(texts: &[&str]) -> VectorIndex {
    let provider = HashProvider::new(384);
    let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
    let vectors = provider.embed_batch(&owned).await.unwrap();

    let chunks = texts
        .iter()
        .enumerate()
        .map(|(i, t)| chunk(i as u64, t))
        .collect();

    VectorIndex::build(chunks, vectors).unwrap()
}

#[tokio::test]
async fn test_relevant_chunk_ranks_first() {
    let index = index_of(&[
        "Section 302 prescribes the punishment for murder under the penal code.",
        "The lease agreement renews automatically every twelve months.",
        "Maritime salvage compensation depends on the value of the recovered vessel.",
    ])
    .await;

    let provider = HashProvider::new(384);
    let query = provider
        .embed("What punishment does Section 302 prescribe for murder?")
        .await
        .unwrap();

    let results = retriever::retrieve(&index, &query, 3).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].chunk_id, 0,
        "Most relevant chunk should be first"
    );
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn test_unrelated_query_scores_low() {
    let index = index_of(&[
        "Section 302 prescribes the punishment for murder under the penal code.",
    ])
    .await;

    let provider = HashProvider::new(384);
    let query = provider
        .embed("zebra quagga safari photography wildlife birdwatching")
        .await
        .unwrap();

    let results = retriever::retrieve(&index, &query, 5).unwrap();
    assert_eq!(results.len(), 1);
    assert!(
        results[0].score < 0.5,
        "Unrelated chunk score should be low: {}",
        results[0].score
    );
}

#[tokio::test]
async fn test_scores_ordered_descending() {
    let index = index_of(&[
        "Arbitration clauses govern dispute resolution between the parties.",
        "The arbitration panel consists of three arbitrators.",
        "Crop rotation improves soil fertility on smallholder farms.",
        "Disputes shall be settled by binding arbitration in London.",
    ])
    .await;

    let provider = HashProvider::new(384);
    let query = provider.embed("how are arbitration disputes resolved").await.unwrap();

    let results = retriever::retrieve(&index, &query, 10).unwrap();
    for pair in results.windows(2) {
        assert!(
            pair[0].score >= pair[1].score,
            "Scores should be ordered: {} >= {}",
            pair[0].score,
            pair[1].score
        );
    }
}

#[tokio::test]
async fn test_top_k_limit_respected() {
    let texts: Vec<String> = (0..10)
        .map(|i| format!("Clause number {} of the master services agreement.", i))
        .collect();
    let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
    let index = index_of(&refs).await;

    let provider = HashProvider::new(384);
    let query = provider.embed("master services agreement clause").await.unwrap();

    let results = retriever::retrieve(&index, &query, 3).unwrap();
    assert_eq!(results.len(), 3, "Should return exactly top_k results");
}

#[tokio::test]
async fn test_identical_text_perfect_score() {
    let text = "Force majeure excuses performance during natural disasters.";
    let index = index_of(&[text]).await;

    let provider = HashProvider::new(384);
    let query = provider.embed(text).await.unwrap();

    let results = retriever::retrieve(&index, &query, 1).unwrap();
    assert!(
        results[0].score > 0.999,
        "Identical text should score ~1.0, got {}",
        results[0].score
    );
}
