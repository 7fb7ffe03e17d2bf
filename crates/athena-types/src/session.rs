//! Conversation turn and room session types.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Bounded, append-only history of one room.
///
/// Never holds more than `max_history_turns`; the oldest turn is dropped
/// first when the cap is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSession {
    pub room_id: String,
    turns: VecDeque<ConversationTurn>,
    pub max_history_turns: usize,
}

impl RoomSession {
    pub fn new(room_id: impl Into<String>, max_history_turns: usize) -> Self {
        Self {
            room_id: room_id.into(),
            turns: VecDeque::with_capacity(max_history_turns.min(64)),
            max_history_turns,
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        if self.max_history_turns == 0 {
            return;
        }
        while self.turns.len() >= self.max_history_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// The most recent `limit` turns in chronological order.
    pub fn recent(&self, limit: usize) -> Vec<ConversationTurn> {
        let skip = self.turns.len().saturating_sub(limit);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
