use serde_json::{Map, Value};
use storechat_core::config::ConversationConfig;
use storechat_core::domain::conversation::{ConversationHistory, ConversationTurn};
use tracing::warn;

use crate::dialog::DialogContext;

const HISTORY_KEY: &str = "history";

/// Carries conversation history through the caller's context objects.
#[derive(Clone, Debug)]
pub struct SessionManager {
    max_history_length: usize,
    context_lifespan: u32,
    context_name: String,
}

impl SessionManager {
    pub fn new(max_history_length: usize, context_lifespan: u32, context_name: impl Into<String>) -> Self {
        Self { max_history_length, context_lifespan, context_name: context_name.into() }
    }

    pub fn from_config(config: &ConversationConfig) -> Self {
        Self::new(
            config.max_history_length,
            config.context_lifespan,
            config.history_context_name.clone(),
        )
    }

    /// History from the first context whose name contains the history marker.
    /// Entries that are not `{role, content}` turns are dropped.
    pub fn load_history(&self, contexts: &[DialogContext], correlation_id: &str) -> ConversationHistory {
        let stored = contexts
            .iter()
            .find(|context| context.name.contains(&self.context_name))
            .and_then(|context| context.parameters.get(HISTORY_KEY));

        let entries = match stored {
            None | Some(Value::Null) => return ConversationHistory::new(self.max_history_length),
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(_) => {
                warn!(
                    event_name = "agent.session.invalid_history",
                    correlation_id,
                    "history parameter is not a list; starting fresh"
                );
                return ConversationHistory::new(self.max_history_length);
            }
        };

        let mut skipped = 0usize;
        let turns = entries
            .iter()
            .filter_map(|entry| match serde_json::from_value::<ConversationTurn>(entry.clone()) {
                Ok(turn) => Some(turn),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .collect::<Vec<_>>();

        if skipped > 0 {
            warn!(
                event_name = "agent.session.skipped_turns",
                correlation_id,
                skipped,
                "dropped history entries that are not conversation turns"
            );
        }

        ConversationHistory::from_turns(turns, self.max_history_length)
    }

    pub fn outbound_context(&self, session: &str, history: &ConversationHistory) -> DialogContext {
        let turns = history
            .iter()
            .filter_map(|turn| serde_json::to_value(turn).ok())
            .collect::<Vec<_>>();
        let mut parameters = Map::new();
        parameters.insert(HISTORY_KEY.to_string(), Value::Array(turns));

        DialogContext {
            name: format!("{session}/contexts/{}", self.context_name),
            lifespan_count: Some(self.context_lifespan),
            parameters,
        }
    }
}
