use std::sync::Arc;

use storechat_core::config::ReasoningEffort;
use storechat_core::domain::conversation::ConversationTurn;
use thiserror::Error;
use tracing::{error, info};

use crate::dialog::{WebhookRequest, WebhookResponse};
use crate::directive::parse_directive;
use crate::dispatch::ActionDispatcher;
use crate::llm::{ChatRequest, LlmClient};
use crate::render;
use crate::session::SessionManager;

/// Request problems detected before any external call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("invalid request payload: missing queryResult")]
    MissingQueryResult,
    #[error("query text is missing")]
    EmptyQuery,
    #[error("session is missing")]
    MissingSession,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnSettings {
    pub max_completion_tokens: u32,
    pub reasoning_effort: ReasoningEffort,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self { max_completion_tokens: 600, reasoning_effort: ReasoningEffort::Minimal }
    }
}

/// One branded agent: a fixed prompt, a model client and a store dispatcher.
pub struct AgentRuntime {
    name: String,
    prompt: String,
    llm: Arc<dyn LlmClient>,
    dispatcher: ActionDispatcher,
    sessions: SessionManager,
    settings: TurnSettings,
}

impl AgentRuntime {
    pub fn new(
        name: impl Into<String>,
        prompt: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        dispatcher: ActionDispatcher,
        sessions: SessionManager,
        settings: TurnSettings,
    ) -> Self {
        Self { name: name.into(), prompt: prompt.into(), llm, dispatcher, sessions, settings }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn handle_webhook(
        &self,
        request: WebhookRequest,
        correlation_id: &str,
    ) -> Result<WebhookResponse, TurnError> {
        let session_id = request.session_id().to_string();
        let query_result = request.query_result.ok_or(TurnError::MissingQueryResult)?;
        let query = query_result.query_text.filter(|text| !text.trim().is_empty());
        let query = query.ok_or(TurnError::EmptyQuery)?;
        let session = request.session.filter(|session| !session.trim().is_empty());
        let session = session.ok_or(TurnError::MissingSession)?;

        info!(
            event_name = "agent.turn.received",
            correlation_id,
            agent = %self.name,
            session_id = %session_id,
            query = %query,
            "received webhook query"
        );

        let mut history = self.sessions.load_history(&query_result.output_contexts, correlation_id);
        history.push(ConversationTurn::user(query));

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ConversationTurn::system(self.prompt.clone()));
        messages.extend(history.iter().cloned());
        let chat = ChatRequest {
            messages,
            max_completion_tokens: self.settings.max_completion_tokens,
            reasoning_effort: self.settings.reasoning_effort,
        };

        let fulfillment_text = match self.llm.complete(chat).await {
            Ok(reply) => {
                info!(
                    event_name = "agent.turn.model_reply",
                    correlation_id,
                    agent = %self.name,
                    reply = %reply,
                    "model replied"
                );
                history.push(ConversationTurn::assistant(reply.clone()));

                match self.resolve_action(&reply, correlation_id).await {
                    Some(action_text) => {
                        history.push(ConversationTurn::assistant(action_text.clone()));
                        action_text
                    }
                    None => reply,
                }
            }
            Err(err) => {
                error!(
                    event_name = "agent.turn.model_failed",
                    correlation_id,
                    agent = %self.name,
                    error = %err,
                    "model call failed"
                );
                render::FALLBACK_TEXT.to_string()
            }
        };

        let context = self.sessions.outbound_context(&session, &history);
        Ok(WebhookResponse { fulfillment_text, output_contexts: vec![context] })
    }

    /// Rendered action text when the reply carries a directive, `None` for plain replies.
    async fn resolve_action(&self, reply: &str, correlation_id: &str) -> Option<String> {
        match parse_directive(reply) {
            Ok(None) => None,
            Ok(Some(directive)) => Some(self.dispatcher.dispatch(&directive, correlation_id).await),
            Err(err) => {
                error!(
                    event_name = "agent.action.malformed",
                    correlation_id,
                    agent = %self.name,
                    error = %err,
                    "could not read action parameters"
                );
                Some(render::FALLBACK_TEXT.to_string())
            }
        }
    }
}
