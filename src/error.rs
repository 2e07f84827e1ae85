//! Crate-wide error type
//!
//! Errors fall into four groups that callers treat differently:
//! - configuration (unknown model, thread or agent role): fail fast, never retried
//! - budget (message too long, system prompt too large, context exceeded)
//! - content contract violations (non-text message content)
//! - transport failures from the completion collaborator
//!
//! Summarization failures never appear here; they are reported through
//! [`crate::context::SummaryOutcome`].

use crate::context::token_budget::BudgetError;
use crate::llm::CompletionError;
use thiserror::Error;
use uuid::Uuid;

/// Marker prefix for content contract violations
pub const INVALID_CONTENT_MARKER: &str = "ERROR_INVALID_MESSAGE_CONTENT";

/// Main error type for context management operations
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Unknown model: {model}. Available models: {available:?}")]
    UnknownModel { model: String, available: Vec<String> },

    #[error("Thread {0} not found")]
    ThreadNotFound(Uuid),

    #[error("Unknown agent role: {0}")]
    UnknownAgent(String),

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error("{INVALID_CONTENT_MARKER}: message content must be a string, got {found}")]
    InvalidMessageContent { found: &'static str },

    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ContextError {
    /// Whether the caller caused this error (bad input, unknown ids, budget)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ContextError::UnknownModel { .. }
                | ContextError::ThreadNotFound(_)
                | ContextError::UnknownAgent(_)
                | ContextError::Budget(_)
                | ContextError::InvalidMessageContent { .. }
        )
    }

    /// Stable machine-readable code for the error
    pub fn code(&self) -> &'static str {
        match self {
            ContextError::UnknownModel { .. } => "UNKNOWN_MODEL",
            ContextError::ThreadNotFound(_) => "THREAD_NOT_FOUND",
            ContextError::UnknownAgent(_) => "UNKNOWN_AGENT",
            ContextError::Budget(BudgetError::MessageTooLong { .. }) => "ERROR_MSG_TOO_LONG",
            ContextError::Budget(BudgetError::SystemPromptTooLarge { .. }) => {
                "ERROR_SYSTEM_PROMPT_TOO_LARGE"
            }
            ContextError::Budget(_) => "BUDGET_EXCEEDED",
            ContextError::InvalidMessageContent { .. } => INVALID_CONTENT_MARKER,
            ContextError::Completion(_) => "COMPLETION_FAILED",
            ContextError::Configuration(_) => "CONFIGURATION_ERROR",
            ContextError::Storage(_) => "STORAGE_ERROR",
            ContextError::Serialization(_) => "SERIALIZATION_ERROR",
            ContextError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convenience result type
pub type Result<T> = std::result::Result<T, ContextError>;
