//! Corpus, chunk, and retrieval result types.
//!
//! A `DocumentChunk` is immutable once it has been inserted into an index.
//! Its `ChunkId` is the insertion position within one index generation,
//! which is also the tie-breaker for equal similarity scores.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// A raw plain-text document handed to the ingestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    /// File name (or other label) surfaced in citations.
    pub name: String,
    pub text: String,
}

impl DocumentSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Stable identity of a chunk within one index generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub u64);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bounded segment of source text and its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub source_name: String,
    pub text: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// One hit from the retriever, ordered by descending score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: ChunkId,
    pub source_name: String,
    pub text: String,
    pub score: f32,
}

/// Which embedding function produced a set of vectors.
///
/// Query and corpus vectors are only comparable when identities match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderIdentity {
    pub model: String,
    pub dimension: usize,
}

impl fmt::Display for EmbedderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}d)", self.model, self.dimension)
    }
}

/// Similarity metric baked into a persisted index.
///
/// Only cosine is supported: vectors are L2-normalized on insert and on
/// query, and the score is their inner product, in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    Cosine,
}

impl SimilarityMetric {
    /// Byte tag written into the vector file header.
    pub fn tag(self) -> u8 {
        match self {
            SimilarityMetric::Cosine => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(SimilarityMetric::Cosine),
            _ => None,
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMetric::Cosine => write!(f, "cosine"),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(SimilarityMetric::Cosine),
            other => Err(format!("invalid similarity metric: '{other}'")),
        }
    }
}
