//! Model registry
//!
//! Read-only mapping from model identifier to [`ModelProfile`]. Built once at
//! startup from the built-in profiles plus any configured extras, then shared
//! by `Arc` with every component that makes budgeting decisions.

mod profiles;

use crate::error::{ContextError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use profiles::builtin_profiles;

/// Provider family of a model; selects the tokens-per-word constant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderFamily {
    OpenAi,
    Google,
    Mistral,
    Anthropic,
    Upstage,
    Other(String),
}

impl ProviderFamily {
    /// Fallback ratio for providers without a tuned constant
    pub const DEFAULT_TOKENS_PER_WORD: f64 = 1.3;

    pub fn as_str(&self) -> &str {
        match self {
            ProviderFamily::OpenAi => "openai",
            ProviderFamily::Google => "google",
            ProviderFamily::Mistral => "mistralai",
            ProviderFamily::Anthropic => "anthropic",
            ProviderFamily::Upstage => "upstage",
            ProviderFamily::Other(name) => name,
        }
    }

    /// Approximate tokens per whitespace-separated word
    pub fn tokens_per_word(&self) -> f64 {
        match self {
            ProviderFamily::OpenAi
            | ProviderFamily::Google
            | ProviderFamily::Mistral
            | ProviderFamily::Anthropic => 1.3,
            ProviderFamily::Upstage | ProviderFamily::Other(_) => Self::DEFAULT_TOKENS_PER_WORD,
        }
    }
}

impl From<String> for ProviderFamily {
    fn from(value: String) -> Self {
        match value.as_str() {
            "openai" => ProviderFamily::OpenAi,
            "google" => ProviderFamily::Google,
            "mistralai" | "mistral" => ProviderFamily::Mistral,
            "anthropic" => ProviderFamily::Anthropic,
            "upstage" => ProviderFamily::Upstage,
            _ => ProviderFamily::Other(value),
        }
    }
}

impl From<ProviderFamily> for String {
    fn from(value: ProviderFamily) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary capacity class of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySize {
    Small,
    Medium,
    Large,
}

impl SummarySize {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummarySize::Small => "small",
            SummarySize::Medium => "medium",
            SummarySize::Large => "large",
        }
    }

    /// How many recent messages are replayed verbatim to a model of this class
    pub fn history_limit(&self) -> usize {
        match self {
            SummarySize::Small => 2,
            SummarySize::Medium => 5,
            SummarySize::Large => 10,
        }
    }
}

impl Default for SummarySize {
    fn default() -> Self {
        SummarySize::Medium
    }
}

impl FromStr for SummarySize {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "small" => Ok(SummarySize::Small),
            "medium" => Ok(SummarySize::Medium),
            "large" => Ok(SummarySize::Large),
            other => Err(ContextError::Configuration(format!(
                "Unknown summary size '{}', expected small, medium or large",
                other
            ))),
        }
    }
}

/// Models the service ships profiles for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownModel {
    Gpt4,
    Gpt4Turbo,
    Gpt35Turbo,
    Mistral7b,
    ClaudeHaiku,
    SolarPro,
    GeminiPro,
}

impl KnownModel {
    pub const ALL: [KnownModel; 7] = [
        KnownModel::Gpt4,
        KnownModel::Gpt4Turbo,
        KnownModel::Gpt35Turbo,
        KnownModel::Mistral7b,
        KnownModel::ClaudeHaiku,
        KnownModel::SolarPro,
        KnownModel::GeminiPro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gpt4 => "openai/gpt-4",
            KnownModel::Gpt4Turbo => "openai/gpt-4-turbo-preview",
            KnownModel::Gpt35Turbo => "openai/gpt-3.5-turbo",
            KnownModel::Mistral7b => "mistralai/mistral-7b-instruct",
            KnownModel::ClaudeHaiku => "anthropic/claude-3-haiku",
            KnownModel::SolarPro => "upstage/solar-pro-3:free",
            KnownModel::GeminiPro => "google/gemini-pro",
        }
    }

    fn lookup(id: &str) -> Option<KnownModel> {
        Self::ALL.iter().copied().find(|m| m.as_str() == id)
    }
}

/// Model identifier, resolved once at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelId {
    Known(KnownModel),
    /// A `provider/name` identifier that passed validation
    Custom(String),
}

impl ModelId {
    /// Parse and validate an identifier
    pub fn parse(raw: &str) -> Result<Self> {
        let id = raw.trim();
        if let Some(known) = KnownModel::lookup(id) {
            return Ok(ModelId::Known(known));
        }

        let valid = match id.split_once('/') {
            Some((provider, name)) => {
                !provider.is_empty()
                    && !name.is_empty()
                    && !id.chars().any(char::is_whitespace)
            }
            None => false,
        };

        if !valid {
            return Err(ContextError::Configuration(format!(
                "Invalid model identifier '{}', expected 'provider/name'",
                raw
            )));
        }

        Ok(ModelId::Custom(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModelId::Known(model) => model.as_str(),
            ModelId::Custom(id) => id,
        }
    }

    /// Provider prefix of the identifier
    pub fn provider_prefix(&self) -> &str {
        self.as_str().split('/').next().unwrap_or_default()
    }
}

impl TryFrom<String> for ModelId {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self> {
        ModelId::parse(&value)
    }
}

impl From<ModelId> for String {
    fn from(value: ModelId) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable budgeting profile of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: ModelId,
    pub provider: ProviderFamily,
    /// Total tokens (input + output) one call may use
    pub context_window: usize,
    pub max_output_tokens: usize,
    #[serde(default)]
    pub preferred_summary_size: SummarySize,
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    #[serde(default)]
    pub description: String,
}

fn default_temperature() -> f32 {
    0.7
}

impl ModelProfile {
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    fn validate(&self) -> Result<()> {
        if self.context_window == 0 {
            return Err(ContextError::Configuration(format!(
                "Model {} has a zero context window",
                self.id
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(ContextError::Configuration(format!(
                "Model {} has zero max output tokens",
                self.id
            )));
        }
        Ok(())
    }
}

/// Read-only model registry
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    profiles: IndexMap<String, ModelProfile>,
}

impl ModelRegistry {
    /// Build a registry from profiles; later duplicates replace earlier ones
    pub fn new(profiles: impl IntoIterator<Item = ModelProfile>) -> Result<Self> {
        let mut map = IndexMap::new();
        for profile in profiles {
            profile.validate()?;
            map.insert(profile.id().to_string(), profile);
        }
        Ok(Self { profiles: map })
    }

    /// Registry containing only the built-in profiles
    pub fn builtin() -> Self {
        let profiles = builtin_profiles()
            .into_iter()
            .map(|p| (p.id().to_string(), p))
            .collect();
        Self { profiles }
    }

    /// Built-in profiles extended with configured extras
    pub fn with_extra(extra: impl IntoIterator<Item = ModelProfile>) -> Result<Self> {
        Self::new(builtin_profiles().into_iter().chain(extra))
    }

    /// Look up a profile; unknown identifiers are a hard error
    pub fn get(&self, model: &str) -> Result<&ModelProfile> {
        self.profiles
            .get(model.trim())
            .ok_or_else(|| ContextError::UnknownModel {
                model: model.to_string(),
                available: self.ids().map(str::to_string).collect(),
            })
    }

    pub fn contains(&self, model: &str) -> bool {
        self.profiles.contains_key(model.trim())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &ModelProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
