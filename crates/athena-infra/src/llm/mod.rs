//! Inference adapters: the Ollama HTTP backend and host accelerator probe.

pub mod ollama;
pub mod probe;

pub use ollama::OllamaBackend;
pub use probe::SystemAcceleratorProbe;
