//! Hash-based embedding provider producing content-aware vectors offline.

use crate::embeddings::provider::EmbeddingProvider;
use crate::embeddings::normalize;
use lexrag_core::AppResult;
use std::collections::{HashMap, HashSet};

/// Deterministic embedding provider for local, offline operation.
///
/// Generates embeddings from word frequencies and character trigrams. Not
/// semantically accurate like a neural model, but consistent and
/// content-dependent, which is enough for development and tests.
#[derive(Debug)]
pub struct HashProvider {
    dimensions: usize,
}

/// Words ignored when building vectors; they carry no discriminating signal.
const STOP_WORDS: [&str; 32] = [
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

impl HashProvider {
    /// Create a new hash provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Generate an embedding from word and trigram hashes.
    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];

        let lower = text.to_lowercase();
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        let words: Vec<&str> = lower
            .split_whitespace()
            .filter(|w| !stop_words.contains(w) && w.len() > 2)
            .collect();

        let mut word_freq = HashMap::new();
        for word in &words {
            *word_freq.entry(*word).or_insert(0u32) += 1;
        }

        // Spread each word over several dimensions via character trigrams so
        // similar vocabulary lands on overlapping buckets.
        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for i in 0..chars.len().saturating_sub(2) {
                let trigram = format!("{}{}{}", chars[i], chars[i + 1], chars[i + 2]);
                let bucket = fold_hash(trigram.bytes(), 37) as usize % self.dimensions;
                // sqrt scale keeps frequent words from dominating
                embedding[bucket] += (*freq as f32).sqrt();
            }

            let bucket = fold_hash(word.bytes(), 31) as usize % self.dimensions;
            embedding[bucket] += *freq as f32;
        }

        normalize(&mut embedding);
        embedding
    }
}

/// Multiplicative byte-fold hash.
fn fold_hash(bytes: impl Iterator<Item = u8>, factor: u64) -> u64 {
    bytes.fold(0u64, |acc, b| {
        acc.wrapping_mul(factor).wrapping_add(b as u64)
    })
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashProvider {
    fn provider_name(&self) -> &str {
        "hash"
    }

    fn model_name(&self) -> &str {
        "sentence-hash-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| self.generate_embedding(text))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_provider_metadata() {
        let provider = HashProvider::new(384);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.provider_name(), "hash");
        assert_eq!(provider.model_name(), "sentence-hash-v1");
    }

    #[tokio::test]
    async fn test_embeddings_are_unit_normalized() {
        let provider = HashProvider::new(384);
        let embedding = provider.embed("the defendant shall appear in court").await.unwrap();

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let provider = HashProvider::new(384);
        let texts = vec![
            "first clause".to_string(),
            "second clause".to_string(),
            "third clause".to_string(),
        ];

        let batch = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 3);

        for (i, text) in texts.iter().enumerate() {
            let single = provider.embed(text).await.unwrap();
            assert_eq!(batch[i], single);
        }
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = HashProvider::new(384);
        let a = provider.embed("deterministic input").await.unwrap();
        let b = provider.embed("deterministic input").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let provider = HashProvider::new(384);
        let a = provider.embed("criminal procedure code").await.unwrap();
        let b = provider.embed("maritime salvage rights").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_empty_text_zero_vector() {
        let provider = HashProvider::new(384);
        let embedding = provider.embed("").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_utf8_safety() {
        let provider = HashProvider::new(384);
        let embedding = provider
            .embed("Cláusula de não-concorrência é válida no contrato")
            .await
            .unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
