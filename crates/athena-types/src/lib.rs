//! Shared domain types for Athena.
//!
//! Corpus chunks, retrieval results, conversation turns, prompt contexts,
//! generation requests, orchestrator request/response shapes, the error
//! taxonomy, and configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod corpus;
pub mod error;
pub mod generation;
pub mod prompt;
pub mod rag;
pub mod session;
