//! Inference: the backend port, device selection, and the engine that owns
//! the loaded model and serializes generation.

pub mod backend;
pub mod box_backend;
pub mod device;
pub mod engine;

pub use backend::InferenceBackend;
pub use box_backend::BoxInferenceBackend;
pub use device::{AcceleratorProbe, FixedProbe, resolve_device};
pub use engine::{InferenceEngine, QueuePolicy};
