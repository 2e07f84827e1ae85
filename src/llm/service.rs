//! Budget-enforcing wrapper around a [`CompletionClient`]
//!
//! Every call is cleaned (filter then trim, reserving the requested output
//! tokens), estimated, and validated against the model's window before the
//! client is invoked. Usage info is built from a fresh per-call
//! [`ContextBudget`].

use super::{CompletionClient, CompletionRequest};
use crate::config::BudgetConfig;
use crate::context::cleaner::{CleanerConfig, CleaningReport, MessageCleaner};
use crate::context::models::ChatMessage;
use crate::context::token_budget::{validate_usage, BudgetError, BudgetStatus, ContextBudget};
use crate::context::token_estimator::{estimate, estimate_conversation};
use crate::error::Result;
use crate::metrics::METRICS;
use crate::registry::{ModelProfile, ModelRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-call options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: usize,
    /// Reject requests whose estimate leaves no room in the window
    pub validate_tokens: bool,
    /// Filter and trim messages before sending
    pub auto_trim: bool,
    /// Overrides the configured per-message token ceiling
    pub max_message_tokens: Option<usize>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            validate_tokens: true,
            auto_trim: true,
            max_message_tokens: None,
        }
    }
}

impl GenerateOptions {
    pub fn new(temperature: f32, max_tokens: usize) -> Self {
        Self {
            temperature,
            max_tokens,
            ..Self::default()
        }
    }

    pub fn with_max_message_tokens(mut self, max: usize) -> Self {
        self.max_message_tokens = Some(max);
        self
    }
}

/// Token accounting of one call, as estimated by this crate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
    pub context_status: BudgetStatus,
    /// Advisory; empty below 50% usage
    pub warning: String,
    pub messages_cleaned: Option<CleaningReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub text: String,
    pub usage: UsageInfo,
}

/// Completion service with context-window enforcement
#[derive(Clone)]
pub struct LlmService {
    client: Arc<dyn CompletionClient>,
    registry: Arc<ModelRegistry>,
    budget: BudgetConfig,
}

impl LlmService {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        registry: Arc<ModelRegistry>,
        budget: BudgetConfig,
    ) -> Self {
        Self {
            client,
            registry,
            budget,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn budget_config(&self) -> &BudgetConfig {
        &self.budget
    }

    pub fn profile(&self, model: &str) -> Result<&ModelProfile> {
        self.registry.get(model)
    }

    /// Token estimate of `text` for `model`
    pub fn token_count(&self, text: &str, model: &str) -> Result<usize> {
        Ok(estimate(text, self.registry.get(model)?))
    }

    fn cleaner(&self, options: &GenerateOptions) -> MessageCleaner {
        let mut config: CleanerConfig = self.budget.cleaner();
        if let Some(max) = options.max_message_tokens {
            config.max_message_tokens = max;
        }
        MessageCleaner::new(config)
    }

    /// Generate a response from `model`
    pub async fn generate(
        &self,
        model: &str,
        system_prompt: &str,
        messages: &[ChatMessage],
        options: GenerateOptions,
    ) -> Result<GeneratedResponse> {
        let profile = self.registry.get(model)?;

        let (messages, cleaning) = if options.auto_trim {
            let (cleaned, report) =
                self.cleaner(&options)
                    .clean(messages, profile, system_prompt, options.max_tokens);
            if let Some(err) = report.trimming.error() {
                warn!(model, "{}", err);
                return Err(err.into());
            }
            METRICS.record_cleaning(
                report.filtering.deleted_count,
                report.trimming.messages_removed(),
            );
            (cleaned, Some(report))
        } else {
            (messages.to_vec(), None)
        };

        let input_tokens = estimate_conversation(&messages, profile, system_prompt);

        if options.validate_tokens {
            let validation = validate_usage(profile, input_tokens, self.budget.validation_buffer);
            if !validation.is_valid {
                METRICS.record_window_usage(input_tokens, validation.remaining, true);
                return Err(BudgetError::ContextExceeded {
                    used: input_tokens,
                    window: profile.context_window,
                    buffer: self.budget.validation_buffer,
                }
                .into());
            }
        }

        debug!(
            model,
            input_tokens,
            messages = messages.len(),
            "Requesting completion"
        );

        let request = CompletionRequest {
            model: profile.id().to_string(),
            system_prompt: system_prompt.to_string(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let completion = self.client.complete(&request).await?;

        let mut budget = ContextBudget::new(profile.clone(), self.budget.safety_buffer);
        budget.add_tokens(input_tokens, "input");
        let output_tokens = budget.add(&completion.text, "response");
        let context_status = budget.status();

        METRICS.record_window_usage(
            budget.used_tokens(),
            context_status.validation.remaining,
            false,
        );

        Ok(GeneratedResponse {
            text: completion.text,
            usage: UsageInfo {
                input_tokens,
                output_tokens,
                total_tokens: input_tokens + output_tokens,
                warning: budget.warn(),
                context_status,
                messages_cleaned: cleaning,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContextError;
    use crate::llm::testing::ScriptedClient;
    use crate::llm::CompletionError;

    fn service(client: Arc<ScriptedClient>) -> LlmService {
        LlmService::new(
            client,
            Arc::new(ModelRegistry::builtin()),
            BudgetConfig::default(),
        )
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[tokio::test]
    async fn test_generate_reports_usage() {
        let client = Arc::new(ScriptedClient::replying("four words of reply"));
        let svc = service(client.clone());

        let response = svc
            .generate(
                "openai/gpt-3.5-turbo",
                "Be helpful",
                &[ChatMessage::user("hello there")],
                GenerateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.text, "four words of reply");
        // 50 + 2 (system) + 2 + 10
        assert_eq!(response.usage.input_tokens, 64);
        assert_eq!(response.usage.output_tokens, 5);
        assert_eq!(response.usage.total_tokens, 69);
        assert_eq!(response.usage.context_status.history_length, 2);
        assert!(response.usage.warning.is_empty());
        assert!(response.usage.messages_cleaned.is_some());

        let sent = client.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].system_prompt, "Be helpful");
        assert_eq!(sent[0].max_tokens, 1000);
    }

    #[tokio::test]
    async fn test_unknown_model_fails_fast() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let svc = service(client.clone());
        let err = svc
            .generate("acme/none", "", &[], GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::UnknownModel { .. }));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_trimming_drops_oldest_before_sending() {
        let client = Arc::new(ScriptedClient::replying("ok"));
        let svc = service(client.clone());
        // gpt-3.5: 4096 window, reserve 3000 leaves 1096 for messages
        let messages = vec![
            ChatMessage::user(words(600)),
            ChatMessage::assistant(words(600)),
            ChatMessage::user("latest"),
        ];
        let response = svc
            .generate(
                "openai/gpt-3.5-turbo",
                "",
                &messages,
                GenerateOptions::new(0.7, 3000),
            )
            .await
            .unwrap();

        let sent = &client.requests()[0];
        assert_eq!(sent.messages.len(), 2);
        assert_eq!(sent.messages[1].content, "latest");
        let report = response.usage.messages_cleaned.unwrap();
        assert_eq!(report.total_removed, 1);
    }

    #[tokio::test]
    async fn test_system_prompt_too_large_is_error() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let svc = service(client.clone());
        let err = svc
            .generate(
                "openai/gpt-3.5-turbo",
                &words(3000),
                &[ChatMessage::user("hi")],
                GenerateOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ERROR_SYSTEM_PROMPT_TOO_LARGE");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_rejects_without_trim() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let svc = service(client.clone());
        let options = GenerateOptions {
            auto_trim: false,
            ..GenerateOptions::default()
        };
        let err = svc
            .generate(
                "openai/gpt-3.5-turbo",
                "",
                &[ChatMessage::user(words(3100))],
                options,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContextError::Budget(BudgetError::ContextExceeded { .. })
        ));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let svc = service(Arc::new(ScriptedClient::failing()));
        let err = svc
            .generate(
                "openai/gpt-4",
                "",
                &[ChatMessage::user("hi")],
                GenerateOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContextError::Completion(CompletionError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_message_ceiling_override() {
        let client = Arc::new(ScriptedClient::replying("ok"));
        let svc = service(client.clone());
        let long = ChatMessage::user(words(1000));

        svc.generate(
            "openai/gpt-4-turbo-preview",
            "",
            &[long.clone()],
            GenerateOptions::default().with_max_message_tokens(1000),
        )
        .await
        .unwrap();
        assert!(client.requests()[0].messages.is_empty());

        svc.generate(
            "openai/gpt-4-turbo-preview",
            "",
            &[long],
            GenerateOptions::default().with_max_message_tokens(50_000),
        )
        .await
        .unwrap();
        assert_eq!(client.requests()[1].messages.len(), 1);
    }
}
