//! Service configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! variables prefixed `CHAT_CONTEXT` with `__` as the section separator
//! (e.g. `CHAT_CONTEXT__SERVER__PORT=9000`).

use crate::context::cleaner::CleanerConfig;
use crate::registry::ModelProfile;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment prefix for every setting
pub const ENV_PREFIX: &str = "CHAT_CONTEXT";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub summarization: SummarizationConfig,

    /// Extra model profiles appended to the built-in registry
    #[serde(default)]
    pub models: Vec<ModelProfile>,
}

impl AppConfig {
    /// Load configuration from an optional file plus the environment.
    ///
    /// `OPENROUTER_API_KEY` is honoured when no key was configured otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut app: AppConfig = builder.build()?.try_deserialize()?;

        if app.completion.api_key.is_none() {
            app.completion.api_key = std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|key| !key.is_empty());
        }

        Ok(app)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Completion transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key; held as a secret once the client is built
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt, for retryable failures only
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Sent as `HTTP-Referer`
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Sent as `X-Title`
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_referer() -> String {
    "http://localhost".to_string()
}

fn default_title() -> String {
    "Chat Service".to_string()
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            referer: default_referer(),
            title: default_title(),
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Token budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Buffer of the per-call usage tracker
    #[serde(default = "default_safety_buffer")]
    pub safety_buffer: usize,

    /// Buffer used when validating a request before sending it
    #[serde(default = "default_validation_buffer")]
    pub validation_buffer: usize,

    #[serde(default = "default_max_message_tokens")]
    pub max_message_tokens: usize,

    #[serde(default)]
    pub max_message_chars: Option<usize>,

    /// Output tokens requested when the caller does not say
    #[serde(default = "default_response_tokens")]
    pub default_response_tokens: usize,
}

fn default_safety_buffer() -> usize {
    500
}

fn default_validation_buffer() -> usize {
    100
}

fn default_max_message_tokens() -> usize {
    5000
}

fn default_response_tokens() -> usize {
    1000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            safety_buffer: default_safety_buffer(),
            validation_buffer: default_validation_buffer(),
            max_message_tokens: default_max_message_tokens(),
            max_message_chars: None,
            default_response_tokens: default_response_tokens(),
        }
    }
}

impl BudgetConfig {
    pub fn cleaner(&self) -> CleanerConfig {
        CleanerConfig {
            max_message_tokens: self.max_message_tokens,
            max_message_chars: self.max_message_chars,
        }
    }
}

/// Per-message workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Messages since the last summary that trigger a new one
    #[serde(default = "default_summarization_threshold")]
    pub summarization_threshold: usize,

    #[serde(default = "default_max_system_prompt_tokens")]
    pub max_system_prompt_tokens: usize,

    /// Sender label of persisted model replies
    #[serde(default = "default_agent_sender")]
    pub agent_sender: String,
}

fn default_summarization_threshold() -> usize {
    4
}

fn default_max_system_prompt_tokens() -> usize {
    250
}

fn default_agent_sender() -> String {
    "Agent".to_string()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            summarization_threshold: default_summarization_threshold(),
            max_system_prompt_tokens: default_max_system_prompt_tokens(),
            agent_sender: default_agent_sender(),
        }
    }
}

/// Summarization model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationConfig {
    #[serde(default = "default_summarization_model")]
    pub model: String,

    /// Per-message ceiling while summarizing; long messages are still summarized
    #[serde(default = "default_summarization_message_tokens")]
    pub max_message_tokens: usize,

    #[serde(default = "default_summarization_temperature")]
    pub temperature: f32,

    #[serde(default = "default_response_tokens")]
    pub max_tokens: usize,
}

fn default_summarization_model() -> String {
    "openai/gpt-3.5-turbo".to_string()
}

fn default_summarization_message_tokens() -> usize {
    50_000
}

fn default_summarization_temperature() -> f32 {
    0.7
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            model: default_summarization_model(),
            max_message_tokens: default_summarization_message_tokens(),
            temperature: default_summarization_temperature(),
            max_tokens: default_response_tokens(),
        }
    }
}
