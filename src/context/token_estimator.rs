//! Word-based token estimation
//!
//! Counts are a budgeting heuristic: whitespace-separated words times a
//! provider-specific ratio. They are not a faithful tokenizer.

use crate::context::models::ChatMessage;
use crate::registry::ModelProfile;

/// Fixed overhead of a conversation's system prompt slot
pub const SYSTEM_OVERHEAD: usize = 50;

/// Fixed overhead per message (role markers, separators)
pub const MESSAGE_OVERHEAD: usize = 10;

/// Token estimator trait for different tokenization strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> usize;

    /// Estimate tokens for multiple texts
    fn estimate_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.estimate(t)).collect()
    }
}

/// Word-based token estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordBasedEstimator {
    tokens_per_word: f64,
}

impl WordBasedEstimator {
    pub fn new(tokens_per_word: f64) -> Self {
        Self { tokens_per_word }
    }

    /// Estimator using the ratio of the profile's provider family
    pub fn for_profile(profile: &ModelProfile) -> Self {
        Self::new(profile.provider.tokens_per_word())
    }

    pub fn tokens_per_word(&self) -> f64 {
        self.tokens_per_word
    }

    /// Floored word estimate without the one-token minimum
    pub fn raw(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        (words as f64 * self.tokens_per_word).floor() as usize
    }
}

impl Default for WordBasedEstimator {
    fn default() -> Self {
        Self::new(1.3)
    }
}

impl TokenEstimator for WordBasedEstimator {
    /// 0 for empty text, at least 1 for anything else
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.raw(text).max(1)
    }
}

/// Estimate tokens of `text` for a model
pub fn estimate(text: &str, profile: &ModelProfile) -> usize {
    WordBasedEstimator::for_profile(profile).estimate(text)
}

/// Estimate a full request: system overhead, system prompt, then each message
/// plus its per-message overhead
pub fn estimate_conversation(
    messages: &[ChatMessage],
    profile: &ModelProfile,
    system_prompt: &str,
) -> usize {
    let estimator = WordBasedEstimator::for_profile(profile);

    let system_tokens = if system_prompt.is_empty() {
        0
    } else {
        estimator.raw(system_prompt)
    };

    messages.iter().fold(SYSTEM_OVERHEAD + system_tokens, |total, message| {
        total + estimator.raw(&message.content) + MESSAGE_OVERHEAD
    })
}

/// Longest word prefix of `text` whose estimate stays within `max_tokens`.
///
/// Text already within the cap is returned unchanged (whitespace included).
pub fn truncate_to_tokens(text: &str, max_tokens: usize, profile: &ModelProfile) -> String {
    let estimator = WordBasedEstimator::for_profile(profile);
    if estimator.estimate(text) <= max_tokens {
        return text.to_string();
    }

    let mut truncated = String::new();
    for word in text.split_whitespace() {
        let candidate = if truncated.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", truncated, word)
        };
        if estimator.estimate(&candidate) > max_tokens {
            break;
        }
        truncated = candidate;
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelRegistry;

    fn gpt35() -> ModelProfile {
        ModelRegistry::builtin()
            .get("openai/gpt-3.5-turbo")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_word_based_estimator() {
        let estimator = WordBasedEstimator::default();
        // 3 words * 1.3 = 3.9 -> 3
        assert_eq!(estimator.estimate("Hello world test"), 3);
        assert_eq!(estimator.estimate("ten words ".repeat(5).trim()), 13);
    }

    #[test]
    fn test_empty_and_minimum() {
        let estimator = WordBasedEstimator::default();
        assert_eq!(estimator.estimate(""), 0);
        assert_eq!(estimator.estimate("   "), 1);
        assert_eq!(estimator.estimate("hi"), 1);
    }

    #[test]
    fn test_batch_estimation() {
        let estimator = WordBasedEstimator::default();
        let tokens = estimator.estimate_batch(&["Hello", "", "one two three four"]);
        assert_eq!(tokens, vec![1, 0, 5]);
    }

    #[test]
    fn test_conversation_estimate() {
        let profile = gpt35();
        let messages = vec![
            ChatMessage::user("one two three four five six seven eight nine ten"),
            ChatMessage::assistant("ok"),
        ];
        // 50 + 13 (system) + (13 + 10) + (1 + 10)
        let total = estimate_conversation(
            &messages,
            &profile,
            "one two three four five six seven eight nine ten",
        );
        assert_eq!(total, 50 + 13 + 23 + 11);
    }

    #[test]
    fn test_conversation_estimate_without_system_prompt() {
        let profile = gpt35();
        assert_eq!(estimate_conversation(&[], &profile, ""), SYSTEM_OVERHEAD);
    }

    #[test]
    fn test_truncate_to_tokens() {
        let profile = gpt35();
        let text = "word ".repeat(400);
        let truncated = truncate_to_tokens(&text, 250, &profile);
        assert!(estimate(&truncated, &profile) <= 250);
        // 193 words -> 250.9 floors to 250; 194 would be 252
        assert_eq!(truncated.split_whitespace().count(), 193);

        let short = "keep me as is ";
        assert_eq!(truncate_to_tokens(short, 250, &profile), short);
    }
}
