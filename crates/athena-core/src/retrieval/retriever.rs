//! Retriever: embeds a query with the ingestion embedder and returns the
//! top-K chunks above a score threshold.

use std::sync::Arc;

use athena_types::corpus::RetrievalResult;
use athena_types::error::RetrievalError;
use tracing::debug;

use crate::embedding::Embedder;
use crate::index::EmbeddingIndex;

pub struct Retriever<E: Embedder> {
    embedder: Arc<E>,
    index: Arc<EmbeddingIndex>,
}

impl<E: Embedder> std::fmt::Debug for Retriever<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.model_name())
            .field("chunks", &self.index.len())
            .field("generation", &self.index.generation())
            .finish()
    }
}

impl<E: Embedder> Retriever<E> {
    /// Pair an embedder with an index.
    ///
    /// Fails with [`RetrievalError::EmbedderMismatch`] unless the index was
    /// built by an embedder with the same model name and dimension.
    pub fn new(embedder: Arc<E>, index: Arc<EmbeddingIndex>) -> Result<Self, RetrievalError> {
        let runtime = embedder.identity();
        if index.identity() != &runtime {
            return Err(RetrievalError::EmbedderMismatch {
                index: index.identity().to_string(),
                runtime: runtime.to_string(),
            });
        }
        Ok(Self { embedder, index })
    }

    /// Up to `k` results in non-increasing score order.
    ///
    /// `k == 0` returns nothing without embedding the query. With a
    /// `min_score`, results scoring below it are dropped; `None` keeps all.
    pub async fn retrieve(
        &self,
        query_text: &str,
        k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[query_text.to_string()]).await?;
        let query = vectors.pop().ok_or_else(|| {
            RetrievalError::Unavailable("embedder returned no vector for the query".into())
        })?;

        let hits = self.index.search(&query, k)?;
        let results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter(|(_, score)| min_score.is_none_or(|min| *score >= min))
            .filter_map(|(id, score)| {
                self.index.get(id).map(|chunk| RetrievalResult {
                    chunk_id: id,
                    source_name: chunk.source_name.clone(),
                    text: chunk.text.clone(),
                    score,
                })
            })
            .collect();

        debug!(k, min_score = ?min_score, hits = results.len(), "Retrieved chunks");
        Ok(results)
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<E> {
        &self.embedder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athena_types::corpus::EmbedderIdentity;
    use athena_types::error::EmbeddingError;

    use crate::embedding::HashingEmbedder;

    fn scenario_index(embedder: &HashingEmbedder) -> EmbeddingIndex {
        let mut index = EmbeddingIndex::new(embedder.identity());
        for (name, text) in [
            ("python.txt", "Python is a programming language."),
            ("faiss.txt", "FAISS performs vector similarity search."),
        ] {
            index.insert(name, text, embedder.embed_one(text)).unwrap();
        }
        index
    }

    fn retriever() -> Retriever<HashingEmbedder> {
        let embedder = HashingEmbedder::new(512);
        let index = scenario_index(&embedder);
        Retriever::new(Arc::new(embedder), Arc::new(index)).unwrap()
    }

    #[tokio::test]
    async fn test_faiss_query_ranks_faiss_chunk_first() {
        let results = retriever().retrieve("What is FAISS?", 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_name, "faiss.txt");
        assert!(results[0].text.contains("FAISS"));
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_zero_k_returns_empty() {
        let results = retriever().retrieve("What is FAISS?", 0, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_sorted_and_above_min_score() {
        let r = retriever();
        for query in ["What is FAISS?", "programming language", "vector search in python"] {
            for min_score in [None, Some(0.0), Some(0.1), Some(0.3)] {
                let results = r.retrieve(query, 5, min_score).await.unwrap();
                assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
                if let Some(min) = min_score {
                    assert!(results.iter().all(|res| res.score >= min));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_min_score_filters_unrelated_chunk() {
        let results = retriever().retrieve("What is FAISS?", 2, Some(0.1)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_name, "faiss.txt");
    }

    #[tokio::test]
    async fn test_zero_threshold_drops_negative_scores() {
        let embedder = HashingEmbedder::new(64);
        let query = embedder.embed_one("What is FAISS?");
        let opposite: Vec<f32> = query.iter().map(|x| -x).collect();
        let mut index = EmbeddingIndex::new(embedder.identity());
        index.insert("faiss.txt", "FAISS", query).unwrap();
        index.insert("opposite.txt", "unrelated", opposite).unwrap();
        let r = Retriever::new(Arc::new(embedder), Arc::new(index)).unwrap();

        let unfiltered = r.retrieve("What is FAISS?", 2, None).await.unwrap();
        assert_eq!(unfiltered.len(), 2);
        assert!(unfiltered[1].score < 0.0);

        let filtered = r.retrieve("What is FAISS?", 2, Some(0.0)).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].source_name, "faiss.txt");
    }

    #[tokio::test]
    async fn test_retrieval_is_deterministic() {
        let r = retriever();
        let a = r.retrieve("vector similarity", 2, None).await.unwrap();
        let b = r.retrieve("vector similarity", 2, None).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let embedder = HashingEmbedder::new(64);
        let index = EmbeddingIndex::new(embedder.identity());
        let r = Retriever::new(Arc::new(embedder), Arc::new(index)).unwrap();
        assert!(r.retrieve("anything", 3, None).await.unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_embedder_is_rejected() {
        let index = EmbeddingIndex::new(EmbedderIdentity {
            model: "all-MiniLM-L6-v2".into(),
            dimension: 384,
        });
        let err = Retriever::new(Arc::new(HashingEmbedder::new(384)), Arc::new(index)).unwrap_err();
        assert!(matches!(err, RetrievalError::EmbedderMismatch { .. }));
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Model("onnx session poisoned".into()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_embedding_failure_surfaces_as_retrieval_error() {
        let mut index = EmbeddingIndex::new(FailingEmbedder.identity());
        index.insert("a.txt", "a", vec![1.0, 0.0]).unwrap();
        let r = Retriever::new(Arc::new(FailingEmbedder), Arc::new(index)).unwrap();
        let err = r.retrieve("q", 1, None).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }
}
