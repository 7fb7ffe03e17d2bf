//! Retrieval-augmented generation engine for Athena.
//!
//! This crate defines the ports (embedder, index repository, corpus source,
//! inference backend) that the infrastructure layer implements, and the
//! components built on them: the embedding index, corpus ingestor,
//! retriever, context assembler, inference engine, session store, and the
//! orchestrator that drives a request through all of them. It depends only
//! on `athena-types` -- never on `athena-infra` or any network/model crate.

pub mod embedding;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod prompt;
pub mod rag;
pub mod retrieval;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
