use std::sync::Arc;

use axum::Router;
use storechat_agent::dispatch::{ActionDispatcher, DispatchSettings};
use storechat_agent::llm::LlmClient;
use storechat_agent::{AgentRuntime, OrderWrites, SessionManager, TurnSettings};
use storechat_core::config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing::info;

use crate::health;
use crate::openai::OpenAiClient;
use crate::webhook::{self, AgentRoute};
use crate::woocommerce::WooCommerceClient;

pub struct Application {
    pub config: AppConfig,
    pub agents: Vec<AgentRoute>,
    /// Background order writes across every agent, drained on shutdown.
    pub writes: OrderWrites,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("model http client could not be built: {0}")]
    LlmClient(#[source] reqwest::Error),
    #[error("store http client for agent `{agent}` could not be built: {source}")]
    StoreClient {
        agent: String,
        #[source]
        source: reqwest::Error,
    },
}

impl Application {
    pub fn router(&self) -> Router {
        webhook::router(self.config.webhook.api_key.clone(), &self.agents)
            .merge(health::router(self.agents.len()))
    }
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        agents = config.agents.len(),
        "starting application bootstrap"
    );

    let llm: Arc<dyn LlmClient> =
        Arc::new(OpenAiClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?);
    let sessions = SessionManager::from_config(&config.conversation);
    let settings = TurnSettings {
        max_completion_tokens: config.llm.max_completion_tokens,
        reasoning_effort: config.llm.reasoning_effort,
    };
    let dispatch_settings = DispatchSettings {
        default_country: config.commerce.default_country.clone(),
        order_search_page_size: config.commerce.order_search_page_size,
        variation_page_size: config.commerce.variation_page_size,
    };
    let writes = OrderWrites::new();

    let mut agents = Vec::with_capacity(config.agents.len());
    for agent in &config.agents {
        let store = WooCommerceClient::new(&agent.slug, &agent.store, config.commerce.timeout_secs)
            .map_err(|source| BootstrapError::StoreClient { agent: agent.slug.clone(), source })?;
        let dispatcher = ActionDispatcher::new(Arc::new(store), dispatch_settings.clone())
            .with_writes(writes.clone());
        let runtime = AgentRuntime::new(
            agent.slug.clone(),
            agent.prompt.clone(),
            Arc::clone(&llm),
            dispatcher,
            sessions.clone(),
            settings,
        );

        info!(
            event_name = "system.bootstrap.agent_ready",
            correlation_id = "bootstrap",
            agent = %agent.slug,
            route = %agent.route,
            "agent route configured"
        );
        agents.push(AgentRoute { route: agent.route.clone(), runtime: Arc::new(runtime) });
    }

    Ok(Application { config, agents, writes })
}
