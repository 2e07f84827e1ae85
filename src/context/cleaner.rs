//! Message filtering and trimming
//!
//! Cleaning runs two stages in a fixed order: drop individually oversized
//! messages, then evict oldest messages until the rest fit the window.

use crate::context::models::ChatMessage;
use crate::context::token_budget::BudgetError;
use crate::context::token_estimator::{TokenEstimator, WordBasedEstimator};
use crate::registry::ModelProfile;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PREVIEW_CHARS: usize = 100;

/// Per-message ceilings for the filter stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanerConfig {
    pub max_message_tokens: usize,
    pub max_message_chars: Option<usize>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            max_message_tokens: 5000,
            max_message_chars: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub deleted_count: usize,
    /// First 100 characters of each dropped message, suffixed with "..."
    pub deleted_content: Vec<String>,
    pub remaining_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrimReport {
    Trimmed {
        messages_removed: usize,
        messages_kept: usize,
        /// System prompt plus kept messages
        tokens_used: usize,
        available_tokens: usize,
        tokens_used_by_messages: usize,
    },
    SystemPromptTooLarge {
        reason: String,
        system_tokens: usize,
        available_tokens: i64,
    },
}

impl TrimReport {
    pub fn messages_removed(&self) -> usize {
        match self {
            TrimReport::Trimmed {
                messages_removed, ..
            } => *messages_removed,
            TrimReport::SystemPromptTooLarge { .. } => 0,
        }
    }

    /// Budget exhaustion as an error, if trimming failed
    pub fn error(&self) -> Option<BudgetError> {
        match self {
            TrimReport::SystemPromptTooLarge {
                system_tokens,
                available_tokens,
                ..
            } => Some(BudgetError::SystemPromptTooLarge {
                system_tokens: *system_tokens,
                available: *available_tokens,
            }),
            TrimReport::Trimmed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub filtering: FilterReport,
    pub trimming: TrimReport,
    pub total_removed: usize,
}

/// Filters and trims message sequences for a target model
#[derive(Debug, Clone, Default)]
pub struct MessageCleaner {
    config: CleanerConfig,
}

impl MessageCleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Drop messages above the token or character ceiling
    pub fn filter(
        &self,
        messages: &[ChatMessage],
        profile: &ModelProfile,
    ) -> (Vec<ChatMessage>, FilterReport) {
        let estimator = WordBasedEstimator::for_profile(profile);
        let mut kept = Vec::with_capacity(messages.len());
        let mut deleted_content = Vec::new();

        for message in messages {
            let content = &message.content;
            let too_many_chars = self
                .config
                .max_message_chars
                .is_some_and(|max| content.chars().count() > max);

            if too_many_chars || estimator.estimate(content) > self.config.max_message_tokens {
                deleted_content.push(preview(content));
                continue;
            }
            kept.push(message.clone());
        }

        let report = FilterReport {
            deleted_count: deleted_content.len(),
            deleted_content,
            remaining_count: kept.len(),
        };
        (kept, report)
    }

    /// Keep the newest messages that fit in
    /// `window - reserve_tokens - system_prompt_tokens`.
    ///
    /// Eviction stops scanning at the first message that overflows; older
    /// messages are dropped with it even if they would fit.
    pub fn trim(
        &self,
        messages: &[ChatMessage],
        profile: &ModelProfile,
        system_prompt: &str,
        reserve_tokens: usize,
    ) -> (Vec<ChatMessage>, TrimReport) {
        let estimator = WordBasedEstimator::for_profile(profile);
        let system_tokens = estimator.estimate(system_prompt);
        let available =
            profile.context_window as i64 - reserve_tokens as i64 - system_tokens as i64;

        if available <= 0 {
            return (
                Vec::new(),
                TrimReport::SystemPromptTooLarge {
                    reason: "System prompt too large for context window".to_string(),
                    system_tokens,
                    available_tokens: available,
                },
            );
        }
        let available = available as usize;

        let mut used = 0;
        let mut kept_from = messages.len();
        for (idx, message) in messages.iter().enumerate().rev() {
            let tokens = estimator.estimate(&message.content);
            if used + tokens > available {
                break;
            }
            used += tokens;
            kept_from = idx;
        }

        let kept = messages[kept_from..].to_vec();
        if kept_from > 0 {
            debug!(
                model = %profile.id,
                removed = kept_from,
                kept = kept.len(),
                "Trimmed oldest messages to fit context window"
            );
        }

        let report = TrimReport::Trimmed {
            messages_removed: kept_from,
            messages_kept: kept.len(),
            tokens_used: system_tokens + used,
            available_tokens: available,
            tokens_used_by_messages: used,
        };
        (kept, report)
    }

    /// Filter, then trim
    pub fn clean(
        &self,
        messages: &[ChatMessage],
        profile: &ModelProfile,
        system_prompt: &str,
        reserve_tokens: usize,
    ) -> (Vec<ChatMessage>, CleaningReport) {
        let (filtered, filtering) = self.filter(messages, profile);
        let (trimmed, trimming) = self.trim(&filtered, profile, system_prompt, reserve_tokens);

        let report = CleaningReport {
            total_removed: filtering.deleted_count + trimming.messages_removed(),
            filtering,
            trimming,
        };
        (trimmed, report)
    }
}

fn preview(content: &str) -> String {
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}
