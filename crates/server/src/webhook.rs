//! Dialog platform fulfillment routes, one per configured agent.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
    Router,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use storechat_agent::{AgentRuntime, WebhookRequest, WebhookResponse};
use tracing::{info, warn};
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "x-api-key";

/// A runtime and the path it answers on.
#[derive(Clone)]
pub struct AgentRoute {
    pub route: String,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Clone)]
struct WebhookState {
    api_key: Arc<SecretString>,
    runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WebhookError {
    pub error: String,
}

type WebhookRejection = (StatusCode, Json<WebhookError>);

fn rejection(status: StatusCode, message: impl Into<String>) -> WebhookRejection {
    (status, Json(WebhookError { error: message.into() }))
}

pub fn router(api_key: SecretString, agents: &[AgentRoute]) -> Router {
    let api_key = Arc::new(api_key);
    agents.iter().fold(Router::new(), |router, agent| {
        let state = WebhookState { api_key: Arc::clone(&api_key), runtime: Arc::clone(&agent.runtime) };
        router.merge(Router::new().route(&agent.route, post(fulfill)).with_state(state))
    })
}

fn authorize(headers: &HeaderMap, state: &WebhookState) -> Result<(), WebhookRejection> {
    let provided = headers.get(API_KEY_HEADER).and_then(|value| value.to_str().ok());
    if provided == Some(state.api_key.expose_secret()) {
        return Ok(());
    }

    warn!(
        event_name = "webhook.unauthorized",
        agent = state.runtime.name(),
        "unauthorized webhook attempt"
    );
    Err(rejection(StatusCode::UNAUTHORIZED, "unauthorized"))
}

async fn fulfill(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookRejection> {
    authorize(&headers, &state)?;

    let correlation_id = Uuid::new_v4().to_string();
    info!(
        event_name = "webhook.received",
        correlation_id = %correlation_id,
        agent = state.runtime.name(),
        "received webhook request"
    );

    let request: WebhookRequest = serde_json::from_slice(&body).map_err(|error| {
        warn!(
            event_name = "webhook.invalid_body",
            correlation_id = %correlation_id,
            agent = state.runtime.name(),
            error = %error,
            "webhook body is not a valid request"
        );
        rejection(StatusCode::BAD_REQUEST, "invalid request payload")
    })?;

    let response = state.runtime.handle_webhook(request, &correlation_id).await.map_err(|error| {
        warn!(
            event_name = "webhook.rejected",
            correlation_id = %correlation_id,
            agent = state.runtime.name(),
            error = %error,
            "webhook request rejected"
        );
        rejection(StatusCode::BAD_REQUEST, error.to_string())
    })?;

    Ok(Json(response))
}
