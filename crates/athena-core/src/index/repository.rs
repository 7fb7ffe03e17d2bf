//! Persistence port for embedding indexes.
//!
//! A persisted index is a vector file plus a parallel metadata file; the
//! file-backed implementation lives in athena-infra.

use athena_types::error::IndexError;

use super::flat::EmbeddingIndex;

pub trait IndexRepository: Send + Sync {
    /// Persist `index`, replacing any previous generation atomically.
    fn save(
        &self,
        index: &EmbeddingIndex,
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Load the persisted index. `Ok(None)` when nothing has been saved yet.
    fn load(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<EmbeddingIndex>, IndexError>> + Send;

    fn exists(&self) -> impl std::future::Future<Output = bool> + Send;
}
