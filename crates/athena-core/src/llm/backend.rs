//! InferenceBackend trait -- the port between the engine and a concrete
//! model runtime.
//!
//! A backend is not assumed to be re-entrant. The engine guarantees at most
//! one `generate` in flight and never calls `generate` before a successful
//! `load`.

use athena_types::error::GenerationError;
use athena_types::generation::{Device, GenerationRequest};

/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in athena-infra.
pub trait InferenceBackend: Send + Sync {
    /// Backend family (e.g., "ollama"), used as `gen_ai.system` on spans.
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Make the model resident on `device`.
    ///
    /// Return [`GenerationError::OutOfMemory`] when the device cannot hold the
    /// model so the engine can fall back to the CPU.
    fn load(
        &self,
        device: Device,
    ) -> impl std::future::Future<Output = Result<(), GenerationError>> + Send;

    /// Produce raw completion text for `request.prompt`.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<String, GenerationError>> + Send;

    /// Release device memory.
    fn unload(&self) -> impl std::future::Future<Output = Result<(), GenerationError>> + Send;
}
