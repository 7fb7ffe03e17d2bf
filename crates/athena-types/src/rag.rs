//! Orchestrator request, response, and health types.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Inbound question. `k` and `max_new_tokens` fall back to configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub query_text: String,
    /// Absent means stateless mode.
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub max_new_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl AskRequest {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            ..Default::default()
        }
    }

    pub fn in_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }
}

/// A cited source, in retrieval order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub source_name: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer_text: String,
    pub source_documents: Vec<SourceDocument>,
    /// Retrieval or the session store failed and the request continued without it.
    pub degraded: bool,
    /// The assembler dropped history or passages to fit the token budget.
    pub truncated: bool,
    /// States the request passed through, ending in `Completed`.
    pub states: Vec<RequestState>,
}

/// Readiness for external health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub index_loaded: bool,
    pub model_loaded: bool,
}

/// Per-request orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Received,
    Retrieving,
    Assembling,
    Generating,
    Completed,
    Failed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Completed | RequestState::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// `Received -> Completed` is the canned-reply shortcut.
    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Received, Retrieving)
            | (Received, Completed)
            | (Retrieving, Assembling)
            | (Assembling, Generating)
            | (Generating, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Received => "received",
            RequestState::Retrieving => "retrieving",
            RequestState::Assembling => "assembling",
            RequestState::Generating => "generating",
            RequestState::Completed => "completed",
            RequestState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
