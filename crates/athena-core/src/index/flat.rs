//! Flat (brute-force) embedding index.
//!
//! Every stored vector is L2-normalized on insert, and every query is
//! normalized before search, so the score is cosine similarity. Search is
//! exact and `O(n * d)`, which is fine for a course-sized corpus.
//!
//! Chunks are append-only. A `ChunkId` is the insertion position, so the
//! ordering `(score desc, id asc)` is a strict total order and ties go to
//! the chunk inserted first. Rebuilding from a corpus produces a new index
//! with a new `generation`; nothing is ever mutated in place.

use athena_types::corpus::{ChunkId, DocumentChunk, EmbedderIdentity, SimilarityMetric};
use athena_types::error::IndexError;
use uuid::Uuid;

use crate::embedding::l2_normalize;

#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    generation: Uuid,
    identity: EmbedderIdentity,
    metric: SimilarityMetric,
    chunks: Vec<DocumentChunk>,
}

impl EmbeddingIndex {
    /// Create an empty index for vectors produced by `identity`.
    pub fn new(identity: EmbedderIdentity) -> Self {
        Self {
            generation: Uuid::now_v7(),
            identity,
            metric: SimilarityMetric::Cosine,
            chunks: Vec::new(),
        }
    }

    /// Reassemble a persisted index.
    ///
    /// Chunk ids must equal their positions and every embedding must have the
    /// identity's dimension; anything else is reported as corruption.
    pub fn from_parts(
        generation: Uuid,
        identity: EmbedderIdentity,
        chunks: Vec<DocumentChunk>,
    ) -> Result<Self, IndexError> {
        for (pos, chunk) in chunks.iter().enumerate() {
            if chunk.id != ChunkId(pos as u64) {
                return Err(IndexError::Corrupt(format!(
                    "chunk at position {pos} has id {}",
                    chunk.id
                )));
            }
            if chunk.embedding.len() != identity.dimension {
                return Err(IndexError::Corrupt(format!(
                    "chunk {} has {} dimensions, expected {}",
                    chunk.id,
                    chunk.embedding.len(),
                    identity.dimension
                )));
            }
        }
        Ok(Self {
            generation,
            identity,
            metric: SimilarityMetric::Cosine,
            chunks,
        })
    }

    /// Append a chunk. Does not rebuild or reorder existing entries.
    pub fn insert(
        &mut self,
        source_name: impl Into<String>,
        text: impl Into<String>,
        mut embedding: Vec<f32>,
    ) -> Result<ChunkId, IndexError> {
        if embedding.len() != self.identity.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.identity.dimension,
                actual: embedding.len(),
            });
        }
        l2_normalize(&mut embedding);

        let id = ChunkId(self.chunks.len() as u64);
        self.chunks.push(DocumentChunk {
            id,
            source_name: source_name.into(),
            text: text.into(),
            embedding,
        });
        Ok(id)
    }

    /// Top-`k` chunks by cosine similarity to `query`.
    ///
    /// An empty index yields an empty result; `k == 0` is an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.identity.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.identity.dimension,
                actual: query.len(),
            });
        }

        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut scored: Vec<(ChunkId, f32)> = self
            .chunks
            .iter()
            .map(|c| (c.id, dot(&q, &c.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn get(&self, id: ChunkId) -> Option<&DocumentChunk> {
        usize::try_from(id.0).ok().and_then(|pos| self.chunks.get(pos))
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn identity(&self) -> &EmbedderIdentity {
        &self.identity
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn dimension(&self) -> usize {
        self.identity.dimension
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
