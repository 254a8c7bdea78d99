use async_trait::async_trait;
use storechat_core::config::ReasoningEffort;
use storechat_core::domain::conversation::ConversationTurn;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<ConversationTurn>,
    pub max_completion_tokens: u32,
    pub reasoning_effort: ReasoningEffort,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model transport failed: {0}")]
    Transport(String),
    #[error("model api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response could not be decoded: {0}")]
    Decode(String),
    #[error("model response contained no choices")]
    EmptyResponse,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the first choice's text, trimmed.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}
