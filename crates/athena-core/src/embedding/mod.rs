//! Text embedding: the `Embedder` port, its type-erased wrapper, and a
//! deterministic feature-hashing embedder that needs no model files.

pub mod box_embedder;
pub mod embedder;
pub mod hashing;

pub use box_embedder::BoxEmbedder;
pub use embedder::{Embedder, l2_normalize};
pub use hashing::HashingEmbedder;
