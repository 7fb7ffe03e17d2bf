//! Configuration types for Athena.
//!
//! `AthenaConfig` is the top-level `config.toml` in the data directory.
//! Every field has a default, so an empty or missing file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::generation::DevicePreference;

const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "\
You are ATHENA, an academic mentor that helps students understand their course material.

Guidelines:
- Answer clearly and in a structured way: a short definition, the key points as bullets, then an example when it helps.
- Ground your answer in the course materials provided. If they do not cover the question, say so and give a brief general explanation.
- Stay professional and concise. Do not invent references, names, or follow-up questions.";

/// Top-level configuration for the Athena assistant.
///
/// Loaded from `~/.athena/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AthenaConfig {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
}

impl AthenaConfig {
    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, message: &str| {
            Err(ConfigError::Invalid {
                field,
                message: message.to_string(),
            })
        };

        if self.corpus.chunk_size == 0 {
            return invalid("corpus.chunk_size", "must be greater than 0");
        }
        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            return invalid("corpus.chunk_overlap", "must be smaller than chunk_size");
        }
        if self.corpus.embed_batch == 0 {
            return invalid("corpus.embed_batch", "must be greater than 0");
        }
        if self.prompt.token_budget == 0 {
            return invalid("prompt.token_budget", "must be greater than 0");
        }
        if self.prompt.chars_per_token == 0 {
            return invalid("prompt.chars_per_token", "must be greater than 0");
        }
        if !(self.generation.temperature >= 0.0) {
            return invalid("generation.temperature", "must be a non-negative number");
        }
        if self.sessions.max_rooms == 0 {
            return invalid("sessions.max_rooms", "must be greater than 0");
        }
        if self.sessions.max_history_turns == 0 {
            return invalid("sessions.max_history_turns", "must be greater than 0");
        }
        if self.embedding.hashing_dimension == 0 {
            return invalid("embedding.hashing_dimension", "must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory of `.txt` files. Relative paths resolve against the data dir.
    #[serde(default = "default_corpus_dir")]
    pub dir: PathBuf,
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_embed_batch")]
    pub embed_batch: usize,
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("corpus")
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_embed_batch() -> usize {
    32
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: default_corpus_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embed_batch: default_embed_batch(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("index")
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
        }
    }
}

/// Which embedding function to use for ingestion and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// all-MiniLM-L6-v2 via ONNX runtime.
    #[default]
    Fastembed,
    /// Deterministic feature hashing. No model download.
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    #[serde(default = "default_hashing_dimension")]
    pub hashing_dimension: usize,
}

fn default_hashing_dimension() -> usize {
    512
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            hashing_dimension: default_hashing_dimension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    /// Results scoring below this are dropped. Unset disables filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
}

fn default_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            min_score: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Maximum prompt size in estimated tokens.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
    #[serde(default = "default_system_instructions")]
    pub system_instructions: String,
}

fn default_token_budget() -> usize {
    2048
}

fn default_chars_per_token() -> usize {
    4
}

fn default_system_instructions() -> String {
    DEFAULT_SYSTEM_INSTRUCTIONS.to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            chars_per_token: default_chars_per_token(),
            system_instructions: default_system_instructions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_new_tokens() -> u32 {
    250
}

fn default_temperature() -> f32 {
    0.5
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// What `generate` does when another generation is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    /// Fail immediately with `EngineError::Busy`.
    #[default]
    Reject,
    /// Wait up to `queue_timeout_ms`, with at most `max_waiters` queued callers.
    Wait,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub device: DevicePreference,
    #[serde(default)]
    pub queue: QueueMode,
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
    #[serde(default = "default_max_waiters")]
    pub max_waiters: usize,
    /// How long the backend keeps the model resident between calls.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_backend() -> String {
    "ollama".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "tinyllama".to_string()
}

fn default_queue_timeout_ms() -> u64 {
    30_000
}

fn default_max_waiters() -> usize {
    8
}

fn default_keep_alive() -> String {
    "30m".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: default_base_url(),
            model: default_model(),
            device: DevicePreference::default(),
            queue: QueueMode::default(),
            queue_timeout_ms: default_queue_timeout_ms(),
            max_waiters: default_max_waiters(),
            keep_alive: default_keep_alive(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Least-recently-used rooms are evicted above this count.
    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
    /// Rooms idle longer than this are evicted. 0 disables.
    #[serde(default)]
    pub idle_ttl_secs: u64,
}

fn default_max_rooms() -> usize {
    1024
}

fn default_max_history_turns() -> usize {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_rooms: default_max_rooms(),
            max_history_turns: default_max_history_turns(),
            idle_ttl_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = AthenaConfig::default();
        assert_eq!(config.retrieval.k, 3);
        assert_eq!(config.retrieval.min_score, None);
        assert_eq!(config.generation.max_new_tokens, 250);
        assert_eq!(config.engine.queue, QueueMode::Reject);
        assert_eq!(config.engine.device, DevicePreference::Auto);
        assert_eq!(config.sessions.max_rooms, 1024);
        assert!(config.prompt.system_instructions.starts_with("You are ATHENA"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: AthenaConfig = toml::from_str("").unwrap();
        assert_eq!(config.corpus.chunk_size, 500);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Fastembed);
        assert_eq!(config.engine.model, "tinyllama");
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let toml_str = r#"
[retrieval]
k = 5
min_score = 0.25

[engine]
model = "mistral"
device = "cpu"
queue = "wait"
max_waiters = 2

[embedding]
provider = "hashing"
"#;
        let config: AthenaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.retrieval.k, 5);
        assert_eq!(config.retrieval.min_score, Some(0.25));
        assert_eq!(config.engine.model, "mistral");
        assert_eq!(config.engine.device, DevicePreference::Cpu);
        assert_eq!(config.engine.queue, QueueMode::Wait);
        assert_eq!(config.engine.max_waiters, 2);
        assert_eq!(config.engine.base_url, "http://localhost:11434");
        assert_eq!(config.embedding.provider, EmbeddingProvider::Hashing);
        assert_eq!(config.embedding.hashing_dimension, 512);
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_chunk_size() {
        let mut config = AthenaConfig::default();
        config.corpus.chunk_overlap = config.corpus.chunk_size;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("corpus.chunk_overlap"));
    }

    #[test]
    fn test_validate_rejects_zero_budget_and_rooms() {
        let mut config = AthenaConfig::default();
        config.prompt.token_budget = 0;
        assert!(config.validate().is_err());

        let mut config = AthenaConfig::default();
        config.sessions.max_rooms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_temperature() {
        let mut config = AthenaConfig::default();
        config.generation.temperature = -0.1;
        assert!(config.validate().is_err());
    }
}
