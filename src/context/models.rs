//! Data models for conversations

use crate::context::summary::SummaryStore;
use crate::error::{ContextError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role of a persisted conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Agent => "agent",
        }
    }
}

/// Role of a message on the completion wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<MessageRole> for ChatRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => ChatRole::User,
            MessageRole::Agent => ChatRole::Assistant,
        }
    }
}

/// Message sent to a completion model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Persisted message; ordered by timestamp within its thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

impl ConversationMessage {
    pub fn to_chat(&self) -> ChatMessage {
        ChatMessage::new(self.role.into(), self.content.clone())
    }
}

/// Message about to be appended to a thread.
///
/// Content arrives untyped from the boundary and is only accepted when it is
/// a JSON string; see [`NewMessage::text`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender: String,
    pub role: MessageRole,
    pub content: Value,
    #[serde(default)]
    pub model_used: Option<String>,
}

impl NewMessage {
    pub fn new(sender: impl Into<String>, role: MessageRole, content: impl Into<Value>) -> Self {
        Self {
            sender: sender.into(),
            role,
            content: content.into(),
            model_used: None,
        }
    }

    pub fn user(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(sender, MessageRole::User, content.into())
    }

    pub fn agent(
        sender: impl Into<String>,
        content: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(sender, MessageRole::Agent, content.into()).with_model(model)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_used = Some(model.into());
        self
    }

    /// Text content, or a content contract violation for anything but a string
    pub fn text(&self) -> Result<&str> {
        match &self.content {
            Value::String(text) => Ok(text),
            other => Err(ContextError::InvalidMessageContent {
                found: json_type_name(other),
            }),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The live summary of a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSummary {
    pub thread_id: Uuid,
    pub summary: SummaryStore,
    /// Messages covered by the summarization that produced this record
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the newest message folded into this summary
    pub covered_until: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_content_accepted() {
        let msg = NewMessage::user("alice", "hello");
        assert_eq!(msg.text().unwrap(), "hello");
    }

    #[test]
    fn test_non_string_content_rejected() {
        let msg = NewMessage::new("alice", MessageRole::User, json!({"text": "hello"}));
        let err = msg.text().unwrap_err();
        assert!(matches!(
            err,
            ContextError::InvalidMessageContent { found: "object" }
        ));

        let msg = NewMessage::new("alice", MessageRole::User, json!(42));
        assert!(msg.text().is_err());
    }

    #[test]
    fn test_agent_role_maps_to_assistant() {
        assert_eq!(ChatRole::from(MessageRole::Agent), ChatRole::Assistant);
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, json!({"role": "assistant", "content": "hi"}));
    }
}
