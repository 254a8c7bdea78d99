//! Agent Runtime - webhook turn handling for branded store chat agents
//!
//! Each agent is a fixed system prompt bound to one store. A turn:
//! 1. **Session** (`session`) - recover history from the inbound dialog context
//! 2. **Model Call** (`llm`) - system prompt + history through an `LlmClient`
//! 3. **Directive Parsing** (`directive`) - find an `[ACTION](name) {...}` marker
//! 4. **Dispatch** (`dispatch`, `render`) - run the store operation and render text
//! 5. **Response** (`dialog`) - fulfillment text plus the updated history context
//!
//! # Key Types
//!
//! - `AgentRuntime` - per-agent orchestrator (see `runtime` module)
//! - `LlmClient` / `CommerceClient` - collaborator seams implemented by the server
//!
//! The model never touches the store directly. It can only ask for one of the
//! known actions, and every store result is rendered by deterministic code.

pub mod background;
pub mod commerce;
pub mod dialog;
pub mod directive;
pub mod dispatch;
pub mod llm;
pub mod render;
pub mod runtime;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use background::OrderWrites;
pub use commerce::{CommerceClient, CommerceError};
pub use dialog::{DialogContext, QueryResult, WebhookRequest, WebhookResponse};
pub use directive::{ActionDirective, ActionKind, DirectiveError};
pub use dispatch::ActionDispatcher;
pub use llm::{ChatRequest, LlmClient, LlmError};
pub use runtime::{AgentRuntime, TurnError, TurnSettings};
pub use session::SessionManager;
