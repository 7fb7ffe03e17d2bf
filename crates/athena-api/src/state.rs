//! Application state wiring the components together.
//!
//! Components are generic over their ports; `AppState` pins them to the
//! infra implementations chosen by `config.toml`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use athena_core::embedding::{BoxEmbedder, Embedder, HashingEmbedder};
use athena_core::index::EmbeddingIndex;
use athena_core::ingest::{Chunker, CorpusIngestor, IngestOutcome};
use athena_core::llm::{BoxInferenceBackend, InferenceEngine, QueuePolicy};
use athena_core::prompt::{ContextAssembler, PromptTemplate, TokenEstimator};
use athena_core::rag::{RagOrchestrator, RagSettings};
use athena_core::retrieval::Retriever;
use athena_core::session::SessionStore;
use athena_infra::config::{AthenaPaths, load_config, resolve_data_dir};
use athena_infra::corpus::DirectoryCorpus;
use athena_infra::embedding::FastEmbedder;
use athena_infra::index::FileIndexRepository;
use athena_infra::llm::{OllamaBackend, SystemAcceleratorProbe};
use athena_types::config::{AthenaConfig, EmbeddingProvider};
use tokio::sync::OnceCell;

pub type ConcreteIngestor = CorpusIngestor<BoxEmbedder, FileIndexRepository>;

pub struct AppState {
    pub config: AthenaConfig,
    pub paths: AthenaPaths,
    pub repository: FileIndexRepository,
    pub orchestrator: Arc<RagOrchestrator>,
    embedder: OnceCell<Arc<BoxEmbedder>>,
}

impl AppState {
    /// Load config and build the engine, session store, and orchestrator.
    ///
    /// Nothing heavy happens here: the embedding model and the index are
    /// loaded on demand, and the language model on first generation.
    pub async fn init(data_dir: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir(data_dir);
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let config = load_config(&data_dir).await?;
        let paths = AthenaPaths::resolve(&data_dir, &config);

        if config.engine.backend != "ollama" {
            bail!(
                "unsupported engine.backend '{}' (supported: ollama)",
                config.engine.backend
            );
        }
        let backend = OllamaBackend::from_config(&config.engine)?;
        let engine = InferenceEngine::new(
            BoxInferenceBackend::new(backend),
            Box::new(SystemAcceleratorProbe::new()),
            config.engine.device,
            QueuePolicy::from_config(&config.engine),
        );

        let assembler = ContextAssembler::new(
            TokenEstimator::new(config.prompt.chars_per_token),
            PromptTemplate::new(),
        );
        let orchestrator = RagOrchestrator::new(
            None,
            assembler,
            Arc::new(engine),
            Arc::new(SessionStore::from_config(&config.sessions)),
            RagSettings::from_config(&config),
        );

        Ok(Self {
            repository: FileIndexRepository::new(&paths.index_dir),
            config,
            paths,
            orchestrator: Arc::new(orchestrator),
            embedder: OnceCell::new(),
        })
    }

    /// The configured embedder, loaded once per process.
    pub async fn embedder(&self) -> anyhow::Result<Arc<BoxEmbedder>> {
        let embedder = self
            .embedder
            .get_or_try_init(|| async {
                let embedder = match self.config.embedding.provider {
                    EmbeddingProvider::Fastembed => {
                        let cache = self.paths.data_dir.join("models");
                        let fast = FastEmbedder::load(Some(cache)).await.context(
                            "failed to load the embedding model; set embedding.provider = \"hashing\" to run offline",
                        )?;
                        BoxEmbedder::new(fast)
                    }
                    EmbeddingProvider::Hashing => {
                        BoxEmbedder::new(HashingEmbedder::new(self.config.embedding.hashing_dimension))
                    }
                };
                Ok::<_, anyhow::Error>(Arc::new(embedder))
            })
            .await?;
        Ok(Arc::clone(embedder))
    }

    pub async fn ingestor(&self) -> anyhow::Result<ConcreteIngestor> {
        let chunker = Chunker::new(self.config.corpus.chunk_size, self.config.corpus.chunk_overlap)?;
        Ok(CorpusIngestor::new(
            self.embedder().await?,
            self.repository.clone(),
            chunker,
            self.config.corpus.embed_batch,
        ))
    }

    /// Load the persisted index (building it from `corpus_dir` when missing
    /// or when `rebuild` is set) and hand it to the orchestrator.
    pub async fn prepare_index(
        &self,
        corpus_dir: Option<PathBuf>,
        rebuild: bool,
    ) -> anyhow::Result<IngestOutcome> {
        let corpus = DirectoryCorpus::new(corpus_dir.unwrap_or_else(|| self.paths.corpus_dir.clone()));
        let outcome = self
            .ingestor()
            .await?
            .load_or_build(&corpus, rebuild)
            .await
            .with_context(|| format!("failed to prepare the index from {}", corpus.dir().display()))?;
        self.attach(outcome.index.clone()).await?;
        Ok(outcome)
    }

    /// Best-effort [`prepare_index`](Self::prepare_index) for commands that
    /// can still answer without course material.
    pub async fn prepare_index_or_degrade(&self) {
        if let Err(e) = self.prepare_index(None, false).await {
            tracing::warn!(
                error = %format!("{e:#}"),
                "No index available; answers will not cite course material"
            );
        }
    }

    async fn attach(&self, index: EmbeddingIndex) -> anyhow::Result<()> {
        let embedder = self.embedder().await?;
        let runtime = embedder.identity();
        let retriever = Retriever::new(embedder, Arc::new(index)).with_context(|| {
            format!("index does not match the {runtime} embedder; run `athena ingest --rebuild`")
        })?;
        self.orchestrator.set_retriever(retriever).await;
        Ok(())
    }
}
