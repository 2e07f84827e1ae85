//! Request and response bodies of the HTTP API

use crate::agents::AgentRole;
use crate::context::models::{ChatMessage, ConversationMessage, StoredSummary, Thread};
use crate::error::ContextError;
use crate::registry::KnownModel;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Stable error codes of the HTTP layer
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
}

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ApiFailure = (StatusCode, Json<ApiError>);
pub type ApiResult<T> = Result<Json<T>, ApiFailure>;

/// Map a core error onto a status code and error body
pub fn error_response(err: ContextError) -> ApiFailure {
    let status = match &err {
        ContextError::ThreadNotFound(_) => StatusCode::NOT_FOUND,
        ContextError::InvalidMessageContent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ContextError::Completion(_) => StatusCode::BAD_GATEWAY,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }
    (status, Json(ApiError::new(err.code(), err.to_string())))
}

pub fn validation_error(message: impl Into<String>) -> ApiFailure {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(error_codes::VALIDATION_ERROR, message)),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThreadRequest {
    pub title: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateThreadRequest {
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListThreadsQuery {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// Thread with its full message log and live summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDetails {
    #[serde(flatten)]
    pub thread: Thread,
    pub messages: Vec<ConversationMessage>,
    pub summary: Option<StoredSummary>,
}

/// User message posted to a thread.
///
/// `content` stays untyped here so non-string content reaches the content
/// check instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub sender: String,
    pub content: serde_json::Value,
    #[serde(default)]
    pub model: Option<String>,
}

impl SendMessageRequest {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or(KnownModel::SolarPro.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryQuery {
    /// Slice the summary to this model's preferred size
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub thread_id: uuid::Uuid,
    pub summary: serde_json::Value,
    pub text: String,
    pub message_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub covered_until: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// Token utilities

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountTokensRequest {
    pub text: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountTokensResponse {
    pub text: String,
    pub model: String,
    pub tokens: usize,
    pub text_length: usize,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountMessagesRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountMessagesResponse {
    pub model: String,
    pub total_tokens: usize,
    pub message_count: usize,
    pub has_system_prompt: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageQuery {
    #[serde(default)]
    pub used_tokens: usize,
    #[serde(default)]
    pub buffer: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableTokensResponse {
    pub model: String,
    pub available_tokens: usize,
    pub buffer: usize,
    pub used_tokens: usize,
    pub context_window: usize,
    pub is_safe: bool,
    pub percentage_used: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFitRequest {
    pub text: String,
    pub model: String,
    #[serde(default)]
    pub used_tokens: usize,
    #[serde(default)]
    pub buffer: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFitResponse {
    pub can_fit: bool,
    pub text_tokens: usize,
    pub available_tokens: usize,
    pub used_tokens: usize,
    pub buffer: usize,
    pub shortage: usize,
    pub model: String,
}

// Agents

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub content: String,
    pub agent_role: AgentRole,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent_role: AgentRole,
    pub response: String,
    pub model_used: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTeamRequest {
    pub content: String,
    pub agent_roles: Vec<AgentRole>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTeamResponse {
    pub agents_used: Vec<AgentRole>,
    pub outputs: indexmap::IndexMap<String, String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadAgentsRequest {
    pub content: String,
    #[serde(default)]
    pub agent_roles: Option<Vec<AgentRole>>,
    #[serde(default)]
    pub use_workflow: bool,
}
