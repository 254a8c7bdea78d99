use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::commerce::{StoreCredentials, DEFAULT_COUNTRY};
use crate::domain::conversation::DEFAULT_MAX_HISTORY_LENGTH;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub llm: LlmConfig,
    pub commerce: CommerceConfig,
    pub conversation: ConversationConfig,
    pub logging: LoggingConfig,
    pub agents: Vec<AgentConfig>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// How long shutdown waits for background order writes.
    pub shutdown_grace_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub api_key: SecretString,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_completion_tokens: u32,
    pub reasoning_effort: ReasoningEffort,
}

#[derive(Clone, Debug)]
pub struct CommerceConfig {
    pub timeout_secs: u64,
    pub default_country: String,
    pub order_search_page_size: u32,
    pub variation_page_size: u32,
}

#[derive(Clone, Debug)]
pub struct ConversationConfig {
    pub max_history_length: usize,
    pub context_lifespan: u32,
    pub history_context_name: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// One branded chat agent: its route, its system prompt and its store.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub slug: String,
    pub route: String,
    pub prompt: String,
    pub store: StoreCredentials,
}

impl AgentConfig {
    pub fn default_route(slug: &str) -> String {
        format!("/llm-integration/{slug}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub webhook_api_key: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
    pub agents: Option<Vec<AgentConfig>>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("could not read prompt file `{path}` for agent `{agent}`: {source}")]
    ReadPrompt { agent: String, path: PathBuf, source: std::io::Error },
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 5000,
                shutdown_grace_secs: 10,
            },
            webhook: WebhookConfig { api_key: String::new().into() },
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-5-mini".to_string(),
                timeout_secs: 60,
                max_completion_tokens: 600,
                reasoning_effort: ReasoningEffort::Minimal,
            },
            commerce: CommerceConfig {
                timeout_secs: 30,
                default_country: DEFAULT_COUNTRY.to_string(),
                order_search_page_size: 100,
                variation_page_size: 100,
            },
            conversation: ConversationConfig {
                max_history_length: DEFAULT_MAX_HISTORY_LENGTH,
                context_lifespan: 20,
                history_context_name: "conversation_history".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            agents: Vec::new(),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for ReasoningEffort {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ConfigError::Validation(format!(
                "unsupported reasoning effort `{other}` (expected minimal|low|medium|high)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            config.apply_patch(patch, &base_dir)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("storechat.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch, base_dir: &Path) -> Result<(), ConfigError> {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(shutdown_grace_secs) = server.shutdown_grace_secs {
                self.server.shutdown_grace_secs = shutdown_grace_secs;
            }
        }

        if let Some(webhook) = patch.webhook {
            if let Some(webhook_api_key_value) = webhook.api_key {
                self.webhook.api_key = secret_value(webhook_api_key_value);
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = secret_value(llm_api_key_value);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_completion_tokens) = llm.max_completion_tokens {
                self.llm.max_completion_tokens = max_completion_tokens;
            }
            if let Some(reasoning_effort) = llm.reasoning_effort {
                self.llm.reasoning_effort = reasoning_effort;
            }
        }

        if let Some(commerce) = patch.commerce {
            if let Some(timeout_secs) = commerce.timeout_secs {
                self.commerce.timeout_secs = timeout_secs;
            }
            if let Some(default_country) = commerce.default_country {
                self.commerce.default_country = default_country;
            }
            if let Some(order_search_page_size) = commerce.order_search_page_size {
                self.commerce.order_search_page_size = order_search_page_size;
            }
            if let Some(variation_page_size) = commerce.variation_page_size {
                self.commerce.variation_page_size = variation_page_size;
            }
        }

        if let Some(conversation) = patch.conversation {
            if let Some(max_history_length) = conversation.max_history_length {
                self.conversation.max_history_length = max_history_length;
            }
            if let Some(context_lifespan) = conversation.context_lifespan {
                self.conversation.context_lifespan = context_lifespan;
            }
            if let Some(history_context_name) = conversation.history_context_name {
                self.conversation.history_context_name = history_context_name;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(agents) = patch.agents {
            self.agents = agents
                .into_iter()
                .map(|agent| agent.resolve(base_dir))
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STORECHAT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STORECHAT_SERVER_PORT") {
            self.server.port = parse_u16("STORECHAT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("STORECHAT_SERVER_SHUTDOWN_GRACE_SECS") {
            self.server.shutdown_grace_secs =
                parse_u64("STORECHAT_SERVER_SHUTDOWN_GRACE_SECS", &value)?;
        }

        if let Some(value) = read_env("STORECHAT_WEBHOOK_API_KEY") {
            self.webhook.api_key = secret_value(value);
        }

        if let Some(value) = read_env("STORECHAT_LLM_API_KEY") {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("STORECHAT_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("STORECHAT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("STORECHAT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("STORECHAT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("STORECHAT_LLM_MAX_COMPLETION_TOKENS") {
            self.llm.max_completion_tokens =
                parse_u32("STORECHAT_LLM_MAX_COMPLETION_TOKENS", &value)?;
        }
        if let Some(value) = read_env("STORECHAT_LLM_REASONING_EFFORT") {
            self.llm.reasoning_effort = value.parse()?;
        }

        if let Some(value) = read_env("STORECHAT_COMMERCE_TIMEOUT_SECS") {
            self.commerce.timeout_secs = parse_u64("STORECHAT_COMMERCE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("STORECHAT_COMMERCE_DEFAULT_COUNTRY") {
            self.commerce.default_country = value;
        }

        if let Some(value) = read_env("STORECHAT_CONVERSATION_MAX_HISTORY_LENGTH") {
            self.conversation.max_history_length =
                parse_u32("STORECHAT_CONVERSATION_MAX_HISTORY_LENGTH", &value)? as usize;
        }

        let log_level =
            read_env("STORECHAT_LOGGING_LEVEL").or_else(|| read_env("STORECHAT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STORECHAT_LOGGING_FORMAT").or_else(|| read_env("STORECHAT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(webhook_api_key) = overrides.webhook_api_key {
            self.webhook.api_key = secret_value(webhook_api_key);
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = secret_value(llm_api_key);
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(agents) = overrides.agents {
            self.agents = agents;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_webhook(&self.webhook)?;
        validate_llm(&self.llm)?;
        validate_commerce(&self.commerce)?;
        validate_conversation(&self.conversation)?;
        validate_logging(&self.logging)?;
        validate_agents(&self.agents)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("storechat.toml"), PathBuf::from("config/storechat.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_webhook(webhook: &WebhookConfig) -> Result<(), ConfigError> {
    if webhook.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "webhook.api_key is required; callers must send it in the `X-API-Key` header"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation("llm.api_key is required".to_string()));
    }
    if !is_http_url(&llm.base_url) {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if llm.max_completion_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_completion_tokens must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_commerce(commerce: &CommerceConfig) -> Result<(), ConfigError> {
    if commerce.timeout_secs == 0 || commerce.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "commerce.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    let country = commerce.default_country.trim();
    if country.len() != 2 || !country.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "commerce.default_country must be a two-letter uppercase country code".to_string(),
        ));
    }
    for (key, value) in [
        ("commerce.order_search_page_size", commerce.order_search_page_size),
        ("commerce.variation_page_size", commerce.variation_page_size),
    ] {
        if value == 0 || value > 100 {
            return Err(ConfigError::Validation(format!("{key} must be in range 1..=100")));
        }
    }
    Ok(())
}

fn validate_conversation(conversation: &ConversationConfig) -> Result<(), ConfigError> {
    if conversation.max_history_length == 0 {
        return Err(ConfigError::Validation(
            "conversation.max_history_length must be greater than zero".to_string(),
        ));
    }
    if conversation.context_lifespan == 0 {
        return Err(ConfigError::Validation(
            "conversation.context_lifespan must be greater than zero".to_string(),
        ));
    }
    if conversation.history_context_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "conversation.history_context_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_agents(agents: &[AgentConfig]) -> Result<(), ConfigError> {
    if agents.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[agents]] entry is required".to_string(),
        ));
    }

    let mut routes = HashSet::new();
    for agent in agents {
        let slug = agent.slug.as_str();
        let valid_slug = !slug.is_empty()
            && slug.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_');
        if !valid_slug {
            return Err(ConfigError::Validation(format!(
                "agents.slug `{slug}` must be non-empty lowercase ascii, digits, `-` or `_`"
            )));
        }
        if !agent.route.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "agents[{slug}].route must start with `/`"
            )));
        }
        if !routes.insert(agent.route.as_str()) {
            return Err(ConfigError::Validation(format!(
                "agents[{slug}].route `{}` is declared more than once",
                agent.route
            )));
        }
        if agent.prompt.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "agents[{slug}] requires a non-empty prompt or prompt_file"
            )));
        }
        if !is_http_url(&agent.store.store_url) {
            return Err(ConfigError::Validation(format!(
                "agents[{slug}].store_url must start with http:// or https://"
            )));
        }
        if agent.store.consumer_key.expose_secret().trim().is_empty()
            || agent.store.consumer_secret.expose_secret().trim().is_empty()
        {
            return Err(ConfigError::Validation(format!(
                "agents[{slug}] requires consumer_key and consumer_secret"
            )));
        }
    }

    Ok(())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    webhook: Option<WebhookPatch>,
    llm: Option<LlmPatch>,
    commerce: Option<CommercePatch>,
    conversation: Option<ConversationPatch>,
    logging: Option<LoggingPatch>,
    agents: Option<Vec<AgentPatch>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    shutdown_grace_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPatch {
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_completion_tokens: Option<u32>,
    reasoning_effort: Option<ReasoningEffort>,
}

#[derive(Debug, Default, Deserialize)]
struct CommercePatch {
    timeout_secs: Option<u64>,
    default_country: Option<String>,
    order_search_page_size: Option<u32>,
    variation_page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPatch {
    max_history_length: Option<usize>,
    context_lifespan: Option<u32>,
    history_context_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    slug: String,
    route: Option<String>,
    prompt: Option<String>,
    prompt_file: Option<PathBuf>,
    store_url: String,
    consumer_key: String,
    consumer_secret: String,
}

impl AgentPatch {
    fn resolve(self, base_dir: &Path) -> Result<AgentConfig, ConfigError> {
        let prompt = match (self.prompt, self.prompt_file) {
            (Some(prompt), _) => prompt,
            (None, Some(prompt_file)) => {
                let path =
                    if prompt_file.is_absolute() { prompt_file } else { base_dir.join(prompt_file) };
                fs::read_to_string(&path).map_err(|source| ConfigError::ReadPrompt {
                    agent: self.slug.clone(),
                    path,
                    source,
                })?
            }
            (None, None) => String::new(),
        };

        Ok(AgentConfig {
            route: self.route.unwrap_or_else(|| AgentConfig::default_route(&self.slug)),
            slug: self.slug,
            prompt,
            store: StoreCredentials {
                store_url: self.store_url,
                consumer_key: secret_value(self.consumer_key),
                consumer_secret: secret_value(self.consumer_secret),
            },
        })
    }
}
