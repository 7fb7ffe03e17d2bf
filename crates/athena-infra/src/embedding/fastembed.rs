//! FastEmbed-based local embedder.
//!
//! Implements [`Embedder`] with fastembed's all-MiniLM-L6-v2 (384
//! dimensions) on the ONNX runtime. `TextEmbedding::embed` takes `&mut self`
//! and is CPU bound, so the model sits behind a mutex and every call runs
//! on the blocking pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use athena_core::embedding::{Embedder, l2_normalize};
use athena_types::error::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";
pub const DIMENSION: usize = 384;

pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    /// Load the model, downloading it into `cache_dir` on first use.
    pub async fn load(cache_dir: Option<PathBuf>) -> Result<Self, EmbeddingError> {
        let model = tokio::task::spawn_blocking(move || {
            let mut options =
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| EmbeddingError::Model(format!("model loader panicked: {e}")))?
        .map_err(|e| EmbeddingError::Model(format!("failed to load {MODEL_NAME}: {e}")))?;

        tracing::info!(model = MODEL_NAME, "Embedding model loaded");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();
        let texts = texts.to_vec();
        let model = Arc::clone(&self.model);

        let mut vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| EmbeddingError::Model("embedding model mutex poisoned".into()))?;
            model
                .embed(texts, None)
                .map_err(|e| EmbeddingError::Model(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::Model(format!("embedding task panicked: {e}")))??;

        if vectors.len() != expected {
            return Err(EmbeddingError::Model(format!(
                "model returned {} vectors for {expected} inputs",
                vectors.len()
            )));
        }
        for v in &mut vectors {
            if v.len() != DIMENSION {
                return Err(EmbeddingError::Model(format!(
                    "model returned a {}-dimensional vector, expected {DIMENSION}",
                    v.len()
                )));
            }
            l2_normalize(v);
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}
