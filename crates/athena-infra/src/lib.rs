//! Infrastructure layer for Athena.
//!
//! Implementations of the ports defined in `athena-core`: a fastembed
//! embedder, the file-backed index repository and its on-disk format, the
//! plain-text corpus directory, the Ollama inference backend, and config
//! loading.

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod index;
pub mod llm;
