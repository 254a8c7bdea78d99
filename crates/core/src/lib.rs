pub mod config;
pub mod domain;

pub use config::{AgentConfig, AppConfig, ConfigError, LoadOptions, LogFormat, ReasoningEffort};
pub use domain::commerce::{
    AddressContact, OrderLineItem, OrderQuery, OrderRecord, OrderRequest, ProductSummary,
    ProductVariation, StoreCredentials,
};
pub use domain::conversation::{ConversationHistory, ConversationTurn, Role};
