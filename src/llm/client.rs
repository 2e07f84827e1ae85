//! OpenRouter chat-completions transport with bounded retries

use super::{Completion, CompletionClient, CompletionError, CompletionRequest, ProviderUsage};
use crate::config::CompletionConfig;
use crate::context::models::ChatMessage;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// OpenAI-compatible completion client
pub struct OpenRouterClient {
    http: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    referer: String,
    title: String,
    max_retries: usize,
    retry_backoff: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<&'a ChatMessage>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ProviderUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CompletionError::Configuration(e.to_string()))?;

        if config.api_key.is_none() {
            warn!("No completion API key configured; upstream calls will be unauthenticated");
        }

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().map(SecretString::new),
            referer: config.referer.clone(),
            title: config.title.clone(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Exponential backoff for the given 1-based attempt
    fn calculate_backoff(&self, attempt: usize) -> Duration {
        let multiplier = 2_u32.saturating_pow(attempt.saturating_sub(1) as u32);
        self.retry_backoff.saturating_mul(multiplier)
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let system = ChatMessage::system(request.system_prompt.clone());
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(&system);
        }
        messages.extend(request.messages.iter());

        let body = ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut req = self
            .http
            .post(&self.endpoint)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body);

        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key.expose_secret());
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(e.to_string())
            } else {
                CompletionError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)?;

        Ok(Completion {
            text,
            provider_usage: chat.usage,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let start = Instant::now();
        let mut attempt = 0;

        let result = loop {
            attempt += 1;
            debug!(model = %request.model, attempt, "Sending completion request");

            match self.send_once(request).await {
                Ok(completion) => break Ok(completion),
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "Completion attempt {} for {} failed: {}, retrying in {:?}",
                        attempt, request.model, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    error!(
                        "Completion for {} failed after {} attempts: {}",
                        request.model, attempt, e
                    );
                    break Err(e);
                }
            }
        };

        METRICS.record_completion(&request.model, result.is_ok(), start.elapsed());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn config(endpoint: String) -> CompletionConfig {
        CompletionConfig {
            endpoint,
            api_key: Some("sk-test".to_string()),
            timeout_ms: 2_000,
            max_retries: 2,
            retry_backoff_ms: 1,
            ..CompletionConfig::default()
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "openai/gpt-3.5-turbo".to_string(),
            system_prompt: "Be brief.".to_string(),
            messages: vec![ChatMessage::user("Hello")],
            temperature: 0.7,
            max_tokens: 100,
        }
    }

    #[test]
    fn test_calculate_backoff() {
        let mut cfg = config("http://localhost".into());
        cfg.retry_backoff_ms = 200;
        let client = OpenRouterClient::new(&cfg).unwrap();

        assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(client.calculate_backoff(2), Duration::from_millis(400));
        assert_eq!(client.calculate_backoff(3), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_header("x-title", "Chat Service")
            .match_body(Matcher::PartialJson(json!({
                "model": "openai/gpt-3.5-turbo",
                "max_tokens": 100,
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "Hello"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{"message": {"role": "assistant", "content": "Hi there"}}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 2, "total_tokens": 14}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client =
            OpenRouterClient::new(&config(format!("{}/chat/completions", server.url()))).unwrap();
        let completion = client.complete(&request()).await.unwrap();

        assert_eq!(completion.text, "Hi there");
        assert_eq!(completion.provider_usage.unwrap().total_tokens, 14);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .expect(3)
            .create_async()
            .await;

        let client =
            OpenRouterClient::new(&config(format!("{}/chat/completions", server.url()))).unwrap();
        let err = client.complete(&request()).await.unwrap_err();

        assert_eq!(
            err,
            CompletionError::Api {
                status: 503,
                body: "overloaded".to_string()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("bad key")
            .expect(1)
            .create_async()
            .await;

        let client =
            OpenRouterClient::new(&config(format!("{}/chat/completions", server.url()))).unwrap();
        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, CompletionError::Api { status: 401, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let client =
            OpenRouterClient::new(&config(format!("{}/chat/completions", server.url()))).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_empty_system_prompt_is_omitted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Json(json!({
                "model": "openai/gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "Hello"}],
                "temperature": 0.5,
                "max_tokens": 100
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"content": "ok"}}]}"#)
            .create_async()
            .await;

        let client =
            OpenRouterClient::new(&config(format!("{}/chat/completions", server.url()))).unwrap();
        let req = CompletionRequest {
            system_prompt: String::new(),
            temperature: 0.5,
            ..request()
        };
        let completion = client.complete(&req).await.unwrap();
        assert_eq!(completion.text, "ok");
        assert!(completion.provider_usage.is_none());
        mock.assert_async().await;
    }
}
