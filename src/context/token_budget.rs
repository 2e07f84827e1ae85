//! Token budget tracking against a model's context window
//!
//! A [`ContextBudget`] is created per response-generation attempt and owned by
//! the caller for that attempt only; it is never shared across requests.
//! Warnings are advisory and never block a request by themselves.

use crate::context::token_estimator::{TokenEstimator, WordBasedEstimator};
use crate::registry::ModelProfile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default safety buffer of a per-turn budget tracker
pub const DEFAULT_SAFETY_BUFFER: usize = 500;

/// Default buffer for one-off validation of a request
pub const DEFAULT_VALIDATION_BUFFER: usize = 100;

/// Token budget errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    #[error("Message too long: {tokens} tokens exceed the model's max output tokens ({max})")]
    MessageTooLong { tokens: usize, max: usize },

    #[error(
        "System prompt too large: {system_tokens} tokens leave {available} tokens for messages"
    )]
    SystemPromptTooLarge { system_tokens: usize, available: i64 },

    #[error(
        "Context window exceeded: {used} of {window} tokens used, {buffer} token safety buffer"
    )]
    ContextExceeded {
        used: usize,
        window: usize,
        buffer: usize,
    },
}

/// Result of validating a token count against a context window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetValidation {
    pub is_valid: bool,
    pub used_tokens: usize,
    pub max_tokens: usize,
    /// Window minus used, floored at zero
    pub remaining: usize,
    pub safety_exceeded: bool,
    /// Rounded to two decimals
    pub percentage_used: f64,
    pub model: String,
}

/// Validate `used_tokens` against the profile's window with a safety buffer.
///
/// Valid only while the remaining capacity is strictly greater than the buffer.
pub fn validate_usage(profile: &ModelProfile, used_tokens: usize, buffer: usize) -> BudgetValidation {
    let window = profile.context_window;
    let remaining = window as i64 - used_tokens as i64;
    let percentage = used_tokens as f64 / window as f64 * 100.0;

    BudgetValidation {
        is_valid: remaining > buffer as i64,
        used_tokens,
        max_tokens: window,
        remaining: remaining.max(0) as usize,
        safety_exceeded: remaining <= buffer as i64,
        percentage_used: (percentage * 100.0).round() / 100.0,
        model: profile.id().to_string(),
    }
}

/// Validation plus tracker state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    #[serde(flatten)]
    pub validation: BudgetValidation,
    pub buffer: usize,
    /// How far usage has eaten into the buffer
    pub tokens_to_safety: usize,
    pub history_length: usize,
}

/// One accounted addition to a budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub source: String,
    pub tokens: usize,
    pub cumulative: usize,
}

/// Advisory usage level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Info,
    Warning,
    Critical,
}

impl WarningLevel {
    pub fn from_percentage(percentage: f64) -> Option<Self> {
        if percentage >= 90.0 {
            Some(WarningLevel::Critical)
        } else if percentage >= 75.0 {
            Some(WarningLevel::Warning)
        } else if percentage >= 50.0 {
            Some(WarningLevel::Info)
        } else {
            None
        }
    }
}

/// Per-turn token usage tracker
#[derive(Debug, Clone)]
pub struct ContextBudget {
    profile: ModelProfile,
    estimator: WordBasedEstimator,
    buffer: usize,
    used_tokens: usize,
    usage_log: Vec<UsageEntry>,
}

impl ContextBudget {
    pub fn new(profile: ModelProfile, buffer: usize) -> Self {
        let estimator = WordBasedEstimator::for_profile(&profile);
        Self {
            profile,
            estimator,
            buffer,
            used_tokens: 0,
            usage_log: Vec::new(),
        }
    }

    /// Tracker with the default 500-token safety buffer
    pub fn with_default_buffer(profile: ModelProfile) -> Self {
        Self::new(profile, DEFAULT_SAFETY_BUFFER)
    }

    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    pub fn buffer(&self) -> usize {
        self.buffer
    }

    pub fn used_tokens(&self) -> usize {
        self.used_tokens
    }

    pub fn usage_log(&self) -> &[UsageEntry] {
        &self.usage_log
    }

    /// Estimate and account `text`; returns the token delta
    pub fn add(&mut self, text: &str, source: &str) -> usize {
        let tokens = self.estimator.estimate(text);
        self.add_tokens(tokens, source);
        tokens
    }

    /// Account an already-estimated token count
    pub fn add_tokens(&mut self, tokens: usize, source: &str) {
        self.used_tokens += tokens;
        self.usage_log.push(UsageEntry {
            source: source.to_string(),
            tokens,
            cumulative: self.used_tokens,
        });
    }

    pub fn reset(&mut self) {
        self.used_tokens = 0;
        self.usage_log.clear();
    }

    pub fn validate(&self) -> BudgetValidation {
        validate_usage(&self.profile, self.used_tokens, self.buffer)
    }

    pub fn is_safe(&self) -> bool {
        self.validate().is_valid
    }

    pub fn status(&self) -> BudgetStatus {
        let validation = self.validate();
        BudgetStatus {
            tokens_to_safety: self.buffer.saturating_sub(validation.remaining),
            buffer: self.buffer,
            history_length: self.usage_log.len(),
            validation,
        }
    }

    /// `max(0, window - used - buffer)`
    pub fn available(&self) -> usize {
        self.profile
            .context_window
            .saturating_sub(self.used_tokens)
            .saturating_sub(self.buffer)
    }

    pub fn can_fit(&self, text: &str) -> bool {
        self.estimator.estimate(text) <= self.available()
    }

    pub fn warning_level(&self) -> Option<WarningLevel> {
        WarningLevel::from_percentage(self.validate().percentage_used)
    }

    /// Advisory message for the current usage level, empty below 50%
    pub fn warn(&self) -> String {
        let status = self.validate();
        let pct = status.percentage_used;
        match WarningLevel::from_percentage(pct) {
            Some(WarningLevel::Critical) => format!(
                "CRITICAL: {}% of context window used. Only {} tokens remaining.",
                pct, status.remaining
            ),
            Some(WarningLevel::Warning) => format!(
                "WARNING: {}% of context window used. {} tokens remaining.",
                pct, status.remaining
            ),
            Some(WarningLevel::Info) => format!("INFO: {}% of context window used.", pct),
            None => String::new(),
        }
    }
}
