//! Persisted index format.
//!
//! An index is two files written side by side:
//!
//! ```text
//! vectors.bin     "ATHIDX" | version u8 | metric u8 | dimension u32 LE | count u64 LE
//!                 | count * dimension f32 LE, in chunk id order
//! manifest.json   format version, generation, metric, dimension, embedder
//!                 identity, SHA-256 of vectors.bin, creation time, and one
//!                 {id, source_name, text} record per vector position
//! ```
//!
//! Decoding trusts nothing: every header field is cross-checked against the
//! manifest and the checksum must match.

use athena_core::index::EmbeddingIndex;
use athena_types::corpus::{ChunkId, DocumentChunk, EmbedderIdentity, SimilarityMetric};
use athena_types::error::IndexError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const VECTORS_FILE: &str = "vectors.bin";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const FORMAT_VERSION: u8 = 1;

const MAGIC: &[u8; 6] = b"ATHIDX";
const HEADER_LEN: usize = MAGIC.len() + 1 + 1 + 4 + 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: ChunkId,
    pub source_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u8,
    pub generation: Uuid,
    pub metric: SimilarityMetric,
    pub dimension: usize,
    pub embedder: EmbedderIdentity,
    pub vectors_sha256: String,
    pub created_at: DateTime<Utc>,
    pub records: Vec<ChunkRecord>,
}

/// Serialize `index` into the vector file bytes and its manifest.
pub fn encode(index: &EmbeddingIndex) -> (Vec<u8>, Manifest) {
    let dimension = index.dimension();
    let chunks = index.chunks();

    let mut bytes = Vec::with_capacity(HEADER_LEN + chunks.len() * dimension * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.push(index.metric().tag());
    bytes.extend_from_slice(&(dimension as u32).to_le_bytes());
    bytes.extend_from_slice(&(chunks.len() as u64).to_le_bytes());
    for chunk in chunks {
        for value in &chunk.embedding {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        generation: index.generation(),
        metric: index.metric(),
        dimension,
        embedder: index.identity().clone(),
        vectors_sha256: sha256_hex(&bytes),
        created_at: Utc::now(),
        records: chunks
            .iter()
            .map(|c| ChunkRecord {
                id: c.id,
                source_name: c.source_name.clone(),
                text: c.text.clone(),
            })
            .collect(),
    };
    (bytes, manifest)
}

/// Rebuild an index from its vector file and manifest.
pub fn decode(bytes: &[u8], manifest: Manifest) -> Result<EmbeddingIndex, IndexError> {
    if manifest.format_version != FORMAT_VERSION {
        return corrupt(format!(
            "unsupported manifest version {}",
            manifest.format_version
        ));
    }
    if sha256_hex(bytes) != manifest.vectors_sha256 {
        return corrupt("vector file checksum does not match manifest".into());
    }
    if bytes.len() < HEADER_LEN {
        return corrupt(format!("vector file is only {} bytes", bytes.len()));
    }

    let (header, body) = bytes.split_at(HEADER_LEN);
    if &header[..MAGIC.len()] != MAGIC {
        return corrupt("bad magic in vector file".into());
    }
    let version = header[6];
    if version != FORMAT_VERSION {
        return corrupt(format!("unsupported vector file version {version}"));
    }
    match SimilarityMetric::from_tag(header[7]) {
        Some(metric) if metric == manifest.metric => {}
        _ => return corrupt(format!("unexpected metric tag {}", header[7])),
    }

    let dimension = u32::from_le_bytes(fixed(&header[8..12])) as usize;
    let count = u64::from_le_bytes(fixed(&header[12..20])) as usize;
    if dimension != manifest.dimension || dimension != manifest.embedder.dimension {
        return corrupt(format!(
            "vector file dimension {dimension} disagrees with manifest {}",
            manifest.dimension
        ));
    }
    if count != manifest.records.len() {
        return corrupt(format!(
            "vector file holds {count} vectors but manifest lists {} chunks",
            manifest.records.len()
        ));
    }
    if dimension == 0 && count > 0 {
        return corrupt("zero-dimensional vectors in a non-empty index".into());
    }
    if count.checked_mul(dimension).and_then(|n| n.checked_mul(4)) != Some(body.len()) {
        return corrupt(format!(
            "vector payload is {} bytes, expected {count} x {dimension} floats",
            body.len()
        ));
    }

    let chunks = if dimension == 0 {
        Vec::new()
    } else {
        body.chunks_exact(dimension * 4)
            .zip(manifest.records)
            .map(|(raw, record)| DocumentChunk {
                id: record.id,
                source_name: record.source_name,
                text: record.text,
                embedding: raw
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes(fixed(b)))
                    .collect(),
            })
            .collect()
    };

    EmbeddingIndex::from_parts(manifest.generation, manifest.embedder, chunks)
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

fn corrupt<T>(message: String) -> Result<T, IndexError> {
    Err(IndexError::Corrupt(message))
}
