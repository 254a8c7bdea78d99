use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Chronological turn buffer bounded by a sliding window.
///
/// Every append drops the oldest turns until at most `max_length` remain, so the
/// buffer always holds the most recent turns in their original order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    max_length: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_LENGTH)
    }
}

impl ConversationHistory {
    pub fn new(max_length: usize) -> Self {
        Self { turns: VecDeque::new(), max_length }
    }

    pub fn from_turns(turns: impl IntoIterator<Item = ConversationTurn>, max_length: usize) -> Self {
        let mut history = Self::new(max_length);
        for turn in turns {
            history.push(turn);
        }
        history
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_length {
            self.turns.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn to_vec(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }
}
