//! Ollama inference backend.
//!
//! [`OllamaBackend`] implements the
//! [`InferenceBackend`](athena_core::llm::InferenceBackend) port against a
//! local Ollama server's `/api/generate` endpoint. Model residency is driven
//! through `keep_alive`, and CPU placement through `num_gpu = 0`.

pub mod client;
pub mod types;

pub use client::OllamaBackend;
