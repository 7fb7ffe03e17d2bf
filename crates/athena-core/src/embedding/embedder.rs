//! Embedder trait for text-to-vector conversion.
//!
//! The same embedder must be used at ingestion and at query time. Its
//! [`EmbedderIdentity`] is stored with a persisted index and checked when a
//! retriever is constructed.

use athena_types::corpus::EmbedderIdentity;
use athena_types::error::EmbeddingError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Model-backed implementations live in athena-infra.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Returns one vector per input, in order.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;

    /// Stable model name, including a version when the model has one.
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    fn identity(&self) -> EmbedderIdentity {
        EmbedderIdentity {
            model: self.model_name().to_string(),
            dimension: self.dimension(),
        }
    }
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0; 4];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }
}
