//! LLM-based structured summarization
//!
//! Summarization is best-effort: it never returns an error. Unparseable model
//! output degrades to an empty summary and a failed model call is reported as
//! [`SummaryOutcome::SkippedDueToError`] for the caller to decide on.

use crate::config::SummarizationConfig;
use crate::context::models::{ChatMessage, ConversationMessage};
use crate::context::summary::SummaryStore;
use crate::llm::{GenerateOptions, LlmService};
use crate::metrics::METRICS;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = r#"You are a sophisticated AI that creates structured, comprehensive summaries
of chat conversations. Analyze the conversation and extract information into these categories:

1. core_facts: List of fundamental facts, data, or information discussed
2. user_preferences: User's preferences, requirements, or stated preferences
3. decisions_made: Any decisions or conclusions that were reached
4. constraints: Limitations, constraints, or requirements mentioned
5. open_questions: Questions that remain unanswered or need follow-up
6. entities: Dictionary of important entities (people, companies, projects, etc.) with their roles
7. unlabeled: Important or notable points that don't fit the above categories

SOFT LIMIT: Keep each category concise. Prioritize quality over quantity. Aim for 3-5 items per list category.
For unlabeled, include only truly significant items that would be lost otherwise.

Respond ONLY with a valid JSON object matching this exact structure:
{
    "core_facts": [],
    "user_preferences": [],
    "decisions_made": [],
    "constraints": [],
    "open_questions": [],
    "entities": {},
    "unlabeled": []
}

All fields must be lists or dicts (as specified). Return ONLY the JSON, no additional text."#;

/// Result of a summarization attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SummaryOutcome {
    Summarized(SummaryStore),
    SkippedDueToError(String),
}

impl SummaryOutcome {
    pub fn store(&self) -> Option<&SummaryStore> {
        match self {
            SummaryOutcome::Summarized(store) => Some(store),
            SummaryOutcome::SkippedDueToError(_) => None,
        }
    }

    pub fn into_store(self) -> Option<SummaryStore> {
        match self {
            SummaryOutcome::Summarized(store) => Some(store),
            SummaryOutcome::SkippedDueToError(_) => None,
        }
    }
}

/// One line per message: `sender (role): content`
pub fn format_conversation(messages: &[ConversationMessage]) -> String {
    messages
        .iter()
        .map(|msg| format!("{} ({}): {}", msg.sender, msg.role.as_str(), msg.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// User prompt for a fresh summary, or a merge into `previous`
pub fn build_prompt(conversation: &str, previous: Option<&SummaryStore>) -> String {
    match previous {
        Some(previous) => {
            let previous_json =
                serde_json::to_string_pretty(previous).unwrap_or_else(|_| "{}".to_string());
            format!(
                "Here's the previous summary:\n{}\n\n\
                 Now, please update and refine this summary based on these new messages:\n\n\
                 {}\n\n\
                 Merge the information appropriately, updating lists with new items and maintaining entity info.",
                previous_json, conversation
            )
        }
        None => format!(
            "Please analyze and summarize this conversation:\n\n{}",
            conversation
        ),
    }
}

/// Parse model output as a summary; `None` when it is not JSON at all
pub fn parse_summary(text: &str) -> Option<SummaryStore> {
    serde_json::from_str::<serde_json::Value>(text.trim())
        .ok()
        .map(SummaryStore::from_value)
}

/// Produces and refines structured summaries through a model call
#[derive(Clone)]
pub struct SummarizationEngine {
    llm: LlmService,
    config: SummarizationConfig,
}

impl SummarizationEngine {
    pub fn new(llm: LlmService, config: SummarizationConfig) -> Self {
        Self { llm, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Summarize `messages`, merging into `previous` when given
    pub async fn summarize(
        &self,
        messages: &[ConversationMessage],
        previous: Option<&SummaryStore>,
    ) -> SummaryOutcome {
        if messages.is_empty() {
            return SummaryOutcome::Summarized(SummaryStore::empty());
        }

        let prompt = build_prompt(&format_conversation(messages), previous);
        let options = GenerateOptions::new(self.config.temperature, self.config.max_tokens)
            .with_max_message_tokens(self.config.max_message_tokens);

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            merging = previous.is_some(),
            "Summarizing conversation"
        );

        let response = match self
            .llm
            .generate(
                &self.config.model,
                SYSTEM_PROMPT,
                &[ChatMessage::user(prompt)],
                options,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Summarization call failed: {}", e);
                METRICS.record_summarization("skipped");
                return SummaryOutcome::SkippedDueToError(e.to_string());
            }
        };

        match parse_summary(&response.text) {
            Some(store) => {
                METRICS.record_summarization("summarized");
                SummaryOutcome::Summarized(store)
            }
            None => {
                warn!(
                    "Failed to parse summary as JSON, using empty summary: {:.200}",
                    response.text
                );
                METRICS.record_summarization("unparseable");
                SummaryOutcome::Summarized(SummaryStore::empty())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BudgetConfig;
    use crate::context::models::MessageRole;
    use crate::llm::testing::ScriptedClient;
    use crate::registry::ModelRegistry;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    fn engine(client: Arc<ScriptedClient>) -> SummarizationEngine {
        let llm = LlmService::new(
            client,
            Arc::new(ModelRegistry::builtin()),
            BudgetConfig::default(),
        );
        SummarizationEngine::new(llm, SummarizationConfig::default())
    }

    fn message(sender: &str, role: MessageRole, content: &str) -> ConversationMessage {
        ConversationMessage {
            id: Uuid::new_v4(),
            thread_id: Uuid::nil(),
            sender: sender.to_string(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            model_used: None,
        }
    }

    #[test]
    fn test_parsed_entities_keep_model_order() {
        let store = parse_summary(r#"{"entities": {"Zed": "z", "Alice": "a"}}"#).unwrap();
        let names: Vec<&str> = store.entities.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Zed", "Alice"]);
        assert!(store.to_text().find("Zed").unwrap() < store.to_text().find("Alice").unwrap());
    }

    #[test]
    fn test_format_conversation() {
        let text = format_conversation(&[
            message("alice", MessageRole::User, "Hi"),
            message("Agent", MessageRole::Agent, "Hello"),
        ]);
        assert_eq!(text, "alice (user): Hi\nAgent (agent): Hello");
    }

    #[test]
    fn test_merge_prompt_embeds_previous() {
        let previous = SummaryStore::from_value(json!({"core_facts": ["likes Rust"]}));
        let prompt = build_prompt("alice (user): hi", Some(&previous));
        assert!(prompt.starts_with("Here's the previous summary:"));
        assert!(prompt.contains("\"likes Rust\""));
        assert!(prompt.contains("alice (user): hi"));

        let fresh = build_prompt("alice (user): hi", None);
        assert!(fresh.starts_with("Please analyze and summarize"));
    }

    #[tokio::test]
    async fn test_empty_input_skips_model() {
        let client = Arc::new(ScriptedClient::replying("{}"));
        let outcome = engine(client.clone()).summarize(&[], None).await;

        let store = outcome.into_store().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.to_value().as_object().unwrap().len(), 7);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summarizes_with_configured_model() {
        let client = Arc::new(ScriptedClient::replying(
            r#"{"core_facts": ["Project uses Rust"], "entities": {"Alice": "lead"}, "constraints": "none"}"#,
        ));
        let outcome = engine(client.clone())
            .summarize(&[message("alice", MessageRole::User, "We use Rust")], None)
            .await;

        let store = outcome.into_store().unwrap();
        assert_eq!(store.core_facts, vec!["Project uses Rust"]);
        assert!(store.constraints.is_empty());
        assert_eq!(store.entities["Alice"], "lead");

        let sent = &client.requests()[0];
        assert_eq!(sent.model, "openai/gpt-3.5-turbo");
        assert!(sent.system_prompt.contains("Respond ONLY with a valid JSON object"));
    }

    #[tokio::test]
    async fn test_unparseable_output_degrades_to_empty() {
        let client = Arc::new(ScriptedClient::replying("Sure! Here is your summary."));
        let outcome = engine(client)
            .summarize(&[message("bob", MessageRole::User, "hello")], None)
            .await;
        assert_eq!(outcome, SummaryOutcome::Summarized(SummaryStore::empty()));
    }

    #[tokio::test]
    async fn test_model_failure_is_reported_not_raised() {
        let outcome = engine(Arc::new(ScriptedClient::failing()))
            .summarize(&[message("bob", MessageRole::User, "hello")], None)
            .await;
        assert!(matches!(outcome, SummaryOutcome::SkippedDueToError(_)));
        assert!(outcome.store().is_none());
    }
}
