use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

/// Errors building an index from a corpus. Fatal to startup only.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("source '{source_name}' is unreadable: {message}")]
    Unreadable { source_name: String, message: String },

    #[error("source '{source_name}' produced zero chunks")]
    EmptySource { source_name: String },

    #[error("corpus contains no documents")]
    EmptyCorpus,

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("invalid chunking parameters: {0}")]
    Chunking(String),
}

/// Errors from the embedding index and its on-disk codec.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("k must be at least 1")]
    InvalidK,

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index is corrupt: {0}")]
    Corrupt(String),

    #[error("index i/o error: {0}")]
    Io(String),
}

/// Errors from text embedding.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model error: {0}")]
    Model(String),

    #[error("invalid embedding input: {0}")]
    Input(String),
}

/// Errors from the retriever. The orchestrator degrades on all of them.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("index unavailable: {0}")]
    Unavailable(String),

    #[error("embedder mismatch: index built with {index}, runtime uses {runtime}")]
    EmbedderMismatch { index: String, runtime: String },

    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Failures of a single generation call.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Empty or otherwise unusable prompt. Not retryable.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Device ran out of memory. Retry after backoff or with fewer new tokens.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    #[error("inference backend error: {message}")]
    Backend { message: String, retryable: bool },

    /// The model could not be loaded on any device. Process-level failure.
    #[error("model load failed: {0}")]
    LoadFailed(String),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::OutOfMemory(_) => true,
            GenerationError::Backend { retryable, .. } => *retryable,
            GenerationError::MalformedInput(_) | GenerationError::LoadFailed(_) => false,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, GenerationError::LoadFailed(_))
    }
}

/// Errors from the inference engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Another generation is in flight and the queue policy refused to wait.
    #[error("inference engine is busy")]
    Busy,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("inference engine has been shut down")]
    ShutDown,
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Busy => true,
            EngineError::Generation(e) => e.is_retryable(),
            EngineError::ShutDown => false,
        }
    }
}

/// Errors from the session store. The orchestrator degrades to stateless mode.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("invalid room id: '{0}'")]
    InvalidRoomId(String),

    #[error("session store is closed")]
    Closed,
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("invalid config value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

/// Category of a user-visible failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Ingestion,
    Retrieval,
    EngineBusy,
    Generation,
    Session,
    Cancelled,
    InvalidRequest,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Ingestion => "ingestion",
            ErrorKind::Retrieval => "retrieval",
            ErrorKind::EngineBusy => "engine_busy",
            ErrorKind::Generation => "generation",
            ErrorKind::Session => "session",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

/// Structured error returned by the orchestrator. Safe to show to users.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RagError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl RagError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message, false)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request cancelled", false)
    }
}

impl From<EngineError> for RagError {
    fn from(e: EngineError) -> Self {
        let retryable = e.is_retryable();
        match e {
            EngineError::Busy => Self::new(
                ErrorKind::EngineBusy,
                "the assistant is answering another question; retry shortly",
                retryable,
            ),
            other => Self::new(ErrorKind::Generation, other.to_string(), retryable),
        }
    }
}

impl From<RetrievalError> for RagError {
    fn from(e: RetrievalError) -> Self {
        Self::new(ErrorKind::Retrieval, e.to_string(), false)
    }
}

impl From<SessionError> for RagError {
    fn from(e: SessionError) -> Self {
        Self::new(ErrorKind::Session, e.to_string(), false)
    }
}

impl From<IngestionError> for RagError {
    fn from(e: IngestionError) -> Self {
        Self::new(ErrorKind::Ingestion, e.to_string(), false)
    }
}
