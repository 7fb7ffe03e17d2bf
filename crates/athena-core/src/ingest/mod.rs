//! Corpus ingestion: chunking raw documents, embedding them, and building
//! (and persisting) a fresh embedding index.

pub mod chunker;
pub mod ingestor;
pub mod source;

pub use chunker::Chunker;
pub use ingestor::{CorpusIngestor, IngestOutcome};
pub use source::CorpusSource;
