//! Query-time retrieval over an embedding index.

pub mod retriever;

pub use retriever::Retriever;
