//! Token-budgeted conversation context management
//!
//! Keeps multi-turn conversations inside a model's context window: token
//! estimation and budgets, message filtering and trimming, threshold-triggered
//! structured summaries sliced per model class, and a fixed-stage multi-agent
//! response pipeline.

pub mod agents;
pub mod api;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod observability;
pub mod registry;
pub mod server;
pub mod storage;

pub use error::{ContextError, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::agents::{AgentCatalog, AgentPipeline, AgentRole, AgentsService};
    pub use crate::config::AppConfig;
    pub use crate::context::{
        ChatMessage, ContextBudget, ConversationMessage, MessageCleaner, MessageRole, NewMessage,
        SummarizationEngine, SummarySlicer, SummaryStore, Thread,
    };
    pub use crate::conversation::ConversationOrchestrator;
    pub use crate::error::{ContextError, Result};
    pub use crate::llm::{CompletionClient, LlmService, OpenRouterClient};
    pub use crate::registry::{ModelProfile, ModelRegistry, SummarySize};
    pub use crate::storage::{ConversationStore, InMemoryStore};
}
