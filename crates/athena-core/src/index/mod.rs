//! Embedding index: an in-memory flat vector store with exact cosine search,
//! and the repository port used to persist it.

pub mod flat;
pub mod repository;

pub use flat::EmbeddingIndex;
pub use repository::IndexRepository;
