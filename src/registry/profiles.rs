//! Built-in model profiles

use super::{KnownModel, ModelId, ModelProfile, ProviderFamily, SummarySize};

fn profile(
    model: KnownModel,
    provider: ProviderFamily,
    context_window: usize,
    max_output_tokens: usize,
    preferred_summary_size: SummarySize,
    description: &str,
) -> ModelProfile {
    ModelProfile {
        id: ModelId::Known(model),
        provider,
        context_window,
        max_output_tokens,
        preferred_summary_size,
        default_temperature: 0.7,
        description: description.to_string(),
    }
}

/// Profiles for every [`KnownModel`]
pub fn builtin_profiles() -> Vec<ModelProfile> {
    vec![
        profile(
            KnownModel::Gpt4,
            ProviderFamily::OpenAi,
            8192,
            8192,
            SummarySize::Large,
            "OpenAI's most capable model with excellent reasoning",
        ),
        profile(
            KnownModel::SolarPro,
            ProviderFamily::Upstage,
            8192,
            8192,
            SummarySize::Large,
            "Upstage Solar Pro",
        ),
        profile(
            KnownModel::Gpt4Turbo,
            ProviderFamily::OpenAi,
            128_000,
            4096,
            SummarySize::Large,
            "OpenAI's fast GPT-4 variant with expanded context",
        ),
        profile(
            KnownModel::Gpt35Turbo,
            ProviderFamily::OpenAi,
            4096,
            4096,
            SummarySize::Medium,
            "OpenAI's fast and cost-effective model",
        ),
        profile(
            KnownModel::Mistral7b,
            ProviderFamily::Mistral,
            32_000,
            1500,
            SummarySize::Medium,
            "Mistral's open-source 7B parameter model",
        ),
        profile(
            KnownModel::ClaudeHaiku,
            ProviderFamily::Anthropic,
            200_000,
            1024,
            SummarySize::Small,
            "Anthropic's fast and compact Claude model",
        ),
        profile(
            KnownModel::GeminiPro,
            ProviderFamily::Google,
            32_760,
            8192,
            SummarySize::Medium,
            "Google's Gemini Pro, used for response synthesis",
        ),
    ]
}
