//! BoxInferenceBackend -- object-safe dynamic dispatch wrapper for
//! InferenceBackend, same blanket-impl shape as `BoxEmbedder`.

use std::future::Future;
use std::pin::Pin;

use athena_types::error::GenerationError;
use athena_types::generation::{Device, GenerationRequest};

use super::backend::InferenceBackend;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GenerationError>> + Send + 'a>>;

/// Object-safe version of [`InferenceBackend`] with boxed futures.
pub trait InferenceBackendDyn: Send + Sync {
    fn name_dyn(&self) -> &str;

    fn model_dyn(&self) -> &str;

    fn load_boxed(&self, device: Device) -> BoxFuture<'_, ()>;

    fn generate_boxed<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, String>;

    fn unload_boxed(&self) -> BoxFuture<'_, ()>;
}

impl<T: InferenceBackend> InferenceBackendDyn for T {
    fn name_dyn(&self) -> &str {
        self.name()
    }

    fn model_dyn(&self) -> &str {
        self.model()
    }

    fn load_boxed(&self, device: Device) -> BoxFuture<'_, ()> {
        Box::pin(self.load(device))
    }

    fn generate_boxed<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, String> {
        Box::pin(self.generate(request))
    }

    fn unload_boxed(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.unload())
    }
}

/// Type-erased inference backend, selected at runtime from config.
pub struct BoxInferenceBackend {
    inner: Box<dyn InferenceBackendDyn + Send + Sync>,
}

impl BoxInferenceBackend {
    pub fn new<T: InferenceBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }
}

impl InferenceBackend for BoxInferenceBackend {
    fn name(&self) -> &str {
        self.inner.name_dyn()
    }

    fn model(&self) -> &str {
        self.inner.model_dyn()
    }

    async fn load(&self, device: Device) -> Result<(), GenerationError> {
        self.inner.load_boxed(device).await
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.inner.generate_boxed(request).await
    }

    async fn unload(&self) -> Result<(), GenerationError> {
        self.inner.unload_boxed().await
    }
}
