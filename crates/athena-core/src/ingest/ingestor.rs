//! Builds an embedding index from a corpus and persists it.

use std::sync::Arc;

use athena_types::corpus::DocumentSource;
use athena_types::error::IngestionError;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::embedding::Embedder;
use crate::index::{EmbeddingIndex, IndexRepository};

use super::chunker::Chunker;
use super::source::CorpusSource;

/// Result of [`CorpusIngestor::load_or_build`].
#[derive(Debug)]
pub struct IngestOutcome {
    pub index: EmbeddingIndex,
    /// `false` when a persisted index was reused without re-embedding.
    pub built: bool,
}

pub struct CorpusIngestor<E: Embedder, R: IndexRepository> {
    embedder: Arc<E>,
    repository: R,
    chunker: Chunker,
    embed_batch: usize,
}

impl<E: Embedder, R: IndexRepository> CorpusIngestor<E, R> {
    pub fn new(embedder: Arc<E>, repository: R, chunker: Chunker, embed_batch: usize) -> Self {
        Self {
            embedder,
            repository,
            chunker,
            embed_batch: embed_batch.max(1),
        }
    }

    /// Chunk, embed, and index `sources` into a fresh index generation, then
    /// persist it.
    ///
    /// Fails if the corpus is empty or any single source yields no chunks.
    /// Nothing is persisted on failure.
    pub async fn build_index(
        &self,
        sources: &[DocumentSource],
    ) -> Result<EmbeddingIndex, IngestionError> {
        let span = info_span!(
            "ingest.build_index",
            sources = sources.len(),
            embedder = %self.embedder.model_name(),
        );

        async {
            let index = self.embed_sources(sources).await?;
            self.repository.save(&index).await?;
            info!(
                chunks = index.len(),
                generation = %index.generation(),
                "Index built and persisted"
            );
            Ok::<_, IngestionError>(index)
        }
        .instrument(span)
        .await
    }

    /// Reuse the persisted index unless `rebuild` is set or none exists.
    pub async fn load_or_build(
        &self,
        corpus: &impl CorpusSource,
        rebuild: bool,
    ) -> Result<IngestOutcome, IngestionError> {
        if !rebuild {
            if let Some(index) = self.repository.load().await? {
                if index.identity() != &self.embedder.identity() {
                    warn!(
                        index = %index.identity(),
                        runtime = %self.embedder.identity(),
                        "Persisted index was built with a different embedder; rebuild to use it"
                    );
                }
                debug!(chunks = index.len(), "Reusing persisted index");
                return Ok(IngestOutcome {
                    index,
                    built: false,
                });
            }
        }

        info!(corpus = %corpus.describe(), rebuild, "Ingesting corpus");
        let sources = corpus.load().await?;
        let index = self.build_index(&sources).await?;
        Ok(IngestOutcome { index, built: true })
    }

    async fn embed_sources(
        &self,
        sources: &[DocumentSource],
    ) -> Result<EmbeddingIndex, IngestionError> {
        if sources.is_empty() {
            return Err(IngestionError::EmptyCorpus);
        }

        let mut pending: Vec<(String, String)> = Vec::new();
        for source in sources {
            let chunks = self.chunker.split(&source.text);
            if chunks.is_empty() {
                return Err(IngestionError::EmptySource {
                    source_name: source.name.clone(),
                });
            }
            debug!(source = %source.name, chunks = chunks.len(), "Chunked source");
            pending.extend(chunks.into_iter().map(|c| (source.name.clone(), c)));
        }

        let mut index = EmbeddingIndex::new(self.embedder.identity());
        for batch in pending.chunks(self.embed_batch) {
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .map_err(|e| IngestionError::Embedding(e.to_string()))?;

            if vectors.len() != batch.len() {
                return Err(IngestionError::Embedding(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            for ((source_name, text), vector) in batch.iter().zip(vectors) {
                index.insert(source_name.as_str(), text.as_str(), vector)?;
            }
        }

        Ok(index)
    }
}
