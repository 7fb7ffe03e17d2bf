//! Request orchestration: retrieval, context assembly, generation, and
//! session bookkeeping for one question at a time.

pub mod lifecycle;
pub mod orchestrator;

pub use lifecycle::{InvalidTransition, RequestLifecycle};
pub use orchestrator::{RagOrchestrator, RagSettings};
