//! Text-completion collaborator
//!
//! The core consumes completions through [`CompletionClient`]; the OpenRouter
//! transport and the budget-enforcing [`LlmService`] wrapper live here.

pub mod client;
pub mod service;

use crate::context::models::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::OpenRouterClient;
pub use service::{GenerateOptions, GeneratedResponse, LlmService, UsageInfo};

/// Transport-level completion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("Request failed: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Upstream returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Upstream response contained no completion")]
    EmptyResponse,

    #[error("Invalid upstream response: {0}")]
    Decode(String),

    #[error("Completion client misconfigured: {0}")]
    Configuration(String),
}

impl CompletionError {
    /// Whether the transport may retry the call
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Network(_) | CompletionError::Timeout(_) => true,
            CompletionError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// One completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Token counts reported by the provider, when it reports any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderUsage {
    #[serde(default)]
    pub prompt_tokens: usize,
    #[serde(default)]
    pub completion_tokens: usize,
    #[serde(default)]
    pub total_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_usage: Option<ProviderUsage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider_usage: None,
        }
    }
}

/// Remote text-completion capability
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(CompletionError::Network("reset".into()).is_retryable());
        assert!(CompletionError::Api {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(CompletionError::Api {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(!CompletionError::Api {
            status: 401,
            body: String::new()
        }
        .is_retryable());
        assert!(!CompletionError::EmptyResponse.is_retryable());
    }
}
