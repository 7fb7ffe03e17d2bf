//! Deterministic feature-hashing embedder.
//!
//! Lowercases the text, splits on non-alphanumeric characters, drops a small
//! English stopword list, and hashes each remaining token with FNV-1a (64-bit)
//! into one of `dimension` signed buckets. The vector is L2-normalized, so
//! cosine similarity reduces to a dot product.
//!
//! Two texts score high when they share content words. There is no
//! semantic generalization: "car" and "automobile" are unrelated.

use athena_types::error::EmbeddingError;

use super::embedder::{Embedder, l2_normalize};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "i", "in", "is", "it", "me", "my", "of", "on", "or", "that", "the", "this", "to", "was",
    "were", "what", "when", "where", "which", "who", "why", "with", "you", "your",
];

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            model_name: "athena-hashing-v1".to_string(),
        }
    }

    /// Embed a single text synchronously.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
            v[bucket] += sign;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |h, b| (h ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a(b""), FNV_OFFSET);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_tokens_lowercase_and_drop_stopwords() {
        let toks: Vec<_> = tokens("What is FAISS? It's fast!").collect();
        assert_eq!(toks, vec!["faiss", "s", "fast"]);
    }

    #[test]
    fn test_embedding_is_deterministic_and_normalized() {
        let e = HashingEmbedder::new(512);
        let a = e.embed_one("FAISS performs vector similarity search.");
        let b = e.embed_one("FAISS performs vector similarity search.");
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_terms_score_higher() {
        let e = HashingEmbedder::new(512);
        let q = e.embed_one("What is FAISS?");
        let faiss = e.embed_one("FAISS performs vector similarity search.");
        let python = e.embed_one("Python is a programming language.");
        assert!(dot(&q, &faiss) > dot(&q, &python));
    }

    #[test]
    fn test_stopword_only_text_is_zero_vector() {
        let e = HashingEmbedder::new(16);
        let v = e.embed_one("what is the");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let e = HashingEmbedder::new(128);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let out = e.embed(&texts).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], e.embed_one("alpha"));
        assert_eq!(out[1], e.embed_one("beta"));
        assert_eq!(e.identity().model, "athena-hashing-v1");
        assert_eq!(e.identity().dimension, 128);
    }
}
