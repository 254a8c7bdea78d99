//! Fulfillment webhook payloads of the dialog platform (Dialogflow ES format).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub query_result: Option<QueryResult>,
}

impl WebhookRequest {
    /// Trailing path segment of the session name, for logs.
    pub fn session_id(&self) -> &str {
        self.session.as_deref().and_then(|session| session.rsplit('/').next()).unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub query_text: Option<String>,
    #[serde(default)]
    pub output_contexts: Vec<DialogContext>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogContext {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan_count: Option<u32>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
    pub output_contexts: Vec<DialogContext>,
}
