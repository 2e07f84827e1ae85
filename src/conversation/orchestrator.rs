//! Per-message conversation workflow
//!
//! One call of [`ConversationOrchestrator::process_user_message`] validates the
//! message, persists it, assembles a budgeted prompt from the thread's system
//! prompt, sliced summary and recent history, calls the model, persists the
//! reply and refreshes the rolling summary once enough messages accumulated.
//!
//! Two requests crossing the threshold on the same thread may both summarize;
//! the last upsert wins. Threads are not serialized.

use crate::config::{BudgetConfig, ConversationConfig};
use crate::context::models::{ChatMessage, ConversationMessage, MessageRole, NewMessage};
use crate::context::slicer::SummarySlicer;
use crate::context::summarizer::{SummarizationEngine, SummaryOutcome};
use crate::context::token_budget::BudgetError;
use crate::context::token_estimator::{estimate, truncate_to_tokens};
use crate::error::Result;
use crate::llm::{GenerateOptions, LlmService, UsageInfo};
use crate::metrics::METRICS;
use crate::registry::ModelProfile;
use crate::storage::ConversationStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Heading of the summary block injected ahead of the history
pub const SUMMARY_HEADER: &str = "[Previous Summary]";

/// What happened to the rolling summary after a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummarizationReport {
    NotTriggered {
        messages_since_summary: usize,
        threshold: usize,
    },
    Updated {
        message_count: usize,
    },
    Skipped {
        reason: String,
    },
}

/// Outcome of one processed user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMessage {
    pub user_message: ConversationMessage,
    pub agent_message: ConversationMessage,
    pub usage: UsageInfo,
    pub summarization: SummarizationReport,
}

/// Glue between storage, the completion service and summarization
#[derive(Clone)]
pub struct ConversationOrchestrator {
    store: Arc<dyn ConversationStore>,
    llm: LlmService,
    summarizer: SummarizationEngine,
    config: ConversationConfig,
}

impl ConversationOrchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        llm: LlmService,
        summarizer: SummarizationEngine,
        config: ConversationConfig,
    ) -> Self {
        Self {
            store,
            llm,
            summarizer,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn llm(&self) -> &LlmService {
        &self.llm
    }

    fn budget(&self) -> &BudgetConfig {
        self.llm.budget_config()
    }

    /// Answer a user message on a thread with `model`.
    ///
    /// `content` must be a JSON string. Oversized messages are rejected before
    /// anything is persisted.
    pub async fn process_user_message(
        &self,
        thread_id: Uuid,
        model: &str,
        sender: &str,
        content: serde_json::Value,
    ) -> Result<ProcessedMessage> {
        let result = self
            .process_inner(thread_id, model, sender, content)
            .await;
        match &result {
            Ok(_) => METRICS.record_message("success"),
            Err(e) if e.is_client_error() => METRICS.record_message("rejected"),
            Err(_) => METRICS.record_message("failed"),
        }
        result
    }

    async fn process_inner(
        &self,
        thread_id: Uuid,
        model: &str,
        sender: &str,
        content: serde_json::Value,
    ) -> Result<ProcessedMessage> {
        let profile = self.llm.profile(model)?.clone();
        let message = NewMessage::new(sender, MessageRole::User, content);
        let text = message.text()?.to_string();

        let tokens = estimate(&text, &profile);
        if tokens > profile.max_output_tokens {
            warn!(
                thread_id = %thread_id,
                tokens,
                max = profile.max_output_tokens,
                "Rejecting oversized message"
            );
            return Err(BudgetError::MessageTooLong {
                tokens,
                max: profile.max_output_tokens,
            }
            .into());
        }

        let thread = self.store.get_thread(thread_id).await?;
        let user_message = self.store.append_message(thread_id, message).await?;

        let (since_summary, summary) = self.store.messages_since_summary(thread_id).await?;
        let history: Vec<&ConversationMessage> = since_summary
            .iter()
            .filter(|msg| msg.id != user_message.id)
            .collect();
        let limit = profile.preferred_summary_size.history_limit();
        let recent = &history[history.len().saturating_sub(limit)..];

        let mut messages = Vec::with_capacity(recent.len() + 2);
        if let Some(stored) = summary.as_ref().filter(|s| !s.summary.is_empty()) {
            let slice = SummarySlicer::for_profile(&stored.summary, &profile);
            messages.push(ChatMessage::assistant(format!(
                "{}\n{}",
                SUMMARY_HEADER,
                slice.to_text()
            )));
        }
        messages.extend(recent.iter().map(|msg| msg.to_chat()));
        messages.push(ChatMessage::user(text));

        let system_prompt = self.system_prompt(thread.system_prompt.as_deref(), &profile);

        debug!(
            thread_id = %thread_id,
            model,
            history = recent.len(),
            has_summary = summary.is_some(),
            "Generating reply"
        );

        let options = GenerateOptions::new(
            profile.default_temperature,
            self.budget().default_response_tokens,
        );
        let response = self
            .llm
            .generate(model, &system_prompt, &messages, options)
            .await?;

        let agent_message = self
            .store
            .append_message(
                thread_id,
                NewMessage::agent(&self.config.agent_sender, response.text, profile.id()),
            )
            .await?;

        // the user message is in `since_summary`, plus the reply just stored
        let pending = since_summary.len() + 1;
        let summarization = if pending >= self.config.summarization_threshold {
            self.refresh_summary(thread_id).await
        } else {
            SummarizationReport::NotTriggered {
                messages_since_summary: pending,
                threshold: self.config.summarization_threshold,
            }
        };

        Ok(ProcessedMessage {
            user_message,
            agent_message,
            usage: response.usage,
            summarization,
        })
    }

    fn system_prompt(&self, prompt: Option<&str>, profile: &ModelProfile) -> String {
        prompt
            .map(|prompt| truncate_to_tokens(prompt, self.config.max_system_prompt_tokens, profile))
            .unwrap_or_default()
    }

    /// Summarize everything since the last summary; never fails the caller
    pub async fn refresh_summary(&self, thread_id: Uuid) -> SummarizationReport {
        let (messages, previous) = match self.store.messages_since_summary(thread_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(thread_id = %thread_id, "Could not load messages for summary: {}", e);
                return SummarizationReport::Skipped {
                    reason: e.to_string(),
                };
            }
        };
        // messages stored while the model is summarizing stay pending
        let covered_until = messages
            .last()
            .map(|msg| msg.timestamp)
            .or_else(|| previous.as_ref().map(|stored| stored.covered_until));
        let previous = previous.map(|stored| stored.summary);

        let store = match self.summarizer.summarize(&messages, previous.as_ref()).await {
            SummaryOutcome::Summarized(store) => store,
            SummaryOutcome::SkippedDueToError(reason) => {
                warn!(thread_id = %thread_id, "Summarization skipped: {}", reason);
                return SummarizationReport::Skipped { reason };
            }
        };

        // an empty result never replaces a real summary
        let store = match previous {
            Some(previous) if store.is_empty() => previous,
            _ => store,
        };

        match self
            .store
            .upsert_summary(thread_id, store, messages.len(), covered_until)
            .await
        {
            Ok(stored) => {
                info!(
                    thread_id = %thread_id,
                    message_count = stored.message_count,
                    "Summary updated"
                );
                SummarizationReport::Updated {
                    message_count: stored.message_count,
                }
            }
            Err(e) => {
                warn!(thread_id = %thread_id, "Failed to store summary: {}", e);
                SummarizationReport::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }
}
