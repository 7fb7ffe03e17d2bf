//! Assembled prompt context types.

use serde::{Deserialize, Serialize};

use crate::corpus::RetrievalResult;
use crate::session::ConversationTurn;

/// Everything that goes into one prompt, already fitted to the token budget.
///
/// Built fresh for every request. `history_window` is chronological and
/// `retrieved_passages` is highest-score first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    pub system_instructions: String,
    pub query: String,
    pub retrieved_passages: Vec<RetrievalResult>,
    pub history_window: Vec<ConversationTurn>,
    pub truncation: TruncationReport,
}

/// What the assembler had to leave out to stay within budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncationReport {
    pub dropped_history_turns: usize,
    pub dropped_passages: usize,
    pub estimated_tokens: usize,
    pub token_budget: usize,
}

impl TruncationReport {
    pub fn is_truncated(&self) -> bool {
        self.dropped_history_turns > 0 || self.dropped_passages > 0
    }
}
