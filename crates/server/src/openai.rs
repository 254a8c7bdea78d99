use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use storechat_agent::llm::{ChatRequest, LlmClient, LlmError};
use storechat_core::config::LlmConfig;

/// Chat completions client for OpenAI-compatible APIs.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_completion_tokens: u32,
    reasoning_effort: &'static str,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let body = CompletionBody {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|turn| WireMessage { role: turn.role.as_str(), content: &turn.content })
                .collect(),
            max_completion_tokens: request.max_completion_tokens,
            reasoning_effort: request.reasoning_effort.as_str(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|error| LlmError::Decode(error.to_string()))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?
            .message
            .content
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}
