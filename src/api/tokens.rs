//! Token counting and context window utilities

use super::handlers::AppState;
use super::models::*;
use crate::context::token_budget::{
    validate_usage, BudgetStatus, BudgetValidation, ContextBudget, DEFAULT_SAFETY_BUFFER,
    DEFAULT_VALIDATION_BUFFER,
};
use crate::context::token_estimator::{estimate, estimate_conversation};
use crate::registry::ModelProfile;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsInfoResponse {
    pub total_models: usize,
    pub models: IndexMap<String, ModelProfile>,
}

fn budget_for(
    state: &AppState,
    model: &str,
    used_tokens: usize,
    buffer: usize,
) -> Result<ContextBudget, ApiFailure> {
    let profile = state.registry.get(model).map_err(error_response)?;
    let mut budget = ContextBudget::new(profile.clone(), buffer);
    if used_tokens > 0 {
        budget.add_tokens(used_tokens, "reported");
    }
    Ok(budget)
}

/// POST /api/v1/tokens/count
pub async fn count_tokens(
    State(state): State<AppState>,
    Json(request): Json<CountTokensRequest>,
) -> ApiResult<CountTokensResponse> {
    if request.text.is_empty() {
        return Err(validation_error("Text cannot be empty"));
    }
    let profile = state.registry.get(&request.model).map_err(error_response)?;

    Ok(Json(CountTokensResponse {
        tokens: estimate(&request.text, profile),
        text_length: request.text.chars().count(),
        word_count: request.text.split_whitespace().count(),
        text: request.text,
        model: request.model,
    }))
}

/// POST /api/v1/tokens/count-messages
pub async fn count_messages(
    State(state): State<AppState>,
    Json(request): Json<CountMessagesRequest>,
) -> ApiResult<CountMessagesResponse> {
    let profile = state.registry.get(&request.model).map_err(error_response)?;
    let system_prompt = request.system_prompt.unwrap_or_default();

    Ok(Json(CountMessagesResponse {
        total_tokens: estimate_conversation(&request.messages, profile, &system_prompt),
        message_count: request.messages.len(),
        has_system_prompt: !system_prompt.is_empty(),
        model: request.model,
    }))
}

/// GET /api/v1/tokens/validate/:model?used_tokens=&buffer=
pub async fn validate(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<BudgetValidation> {
    let profile = state.registry.get(&model).map_err(error_response)?;
    let buffer = query.buffer.unwrap_or(DEFAULT_VALIDATION_BUFFER);
    Ok(Json(validate_usage(profile, query.used_tokens, buffer)))
}

/// GET /api/v1/tokens/status/:model?used_tokens=&buffer=
pub async fn status(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<BudgetStatus> {
    let budget = budget_for(
        &state,
        &model,
        query.used_tokens,
        query.buffer.unwrap_or(DEFAULT_SAFETY_BUFFER),
    )?;
    Ok(Json(budget.status()))
}

/// GET /api/v1/tokens/available-tokens/:model?used_tokens=&buffer=
pub async fn available_tokens(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<AvailableTokensResponse> {
    let buffer = query.buffer.unwrap_or(DEFAULT_SAFETY_BUFFER);
    let budget = budget_for(&state, &model, query.used_tokens, buffer)?;
    let validation = budget.validate();

    Ok(Json(AvailableTokensResponse {
        available_tokens: budget.available(),
        buffer,
        used_tokens: query.used_tokens,
        context_window: budget.profile().context_window,
        is_safe: validation.is_valid,
        percentage_used: validation.percentage_used,
        model,
    }))
}

/// POST /api/v1/tokens/check-fit
pub async fn check_fit(
    State(state): State<AppState>,
    Json(request): Json<CheckFitRequest>,
) -> ApiResult<CheckFitResponse> {
    if request.text.is_empty() {
        return Err(validation_error("Text cannot be empty"));
    }
    let buffer = request.buffer.unwrap_or(DEFAULT_SAFETY_BUFFER);
    let budget = budget_for(&state, &request.model, request.used_tokens, buffer)?;

    let text_tokens = estimate(&request.text, budget.profile());
    let available = budget.available();

    Ok(Json(CheckFitResponse {
        can_fit: budget.can_fit(&request.text),
        text_tokens,
        available_tokens: available,
        used_tokens: request.used_tokens,
        buffer,
        shortage: text_tokens.saturating_sub(available),
        model: request.model,
    }))
}

/// GET /api/v1/tokens/models-info
pub async fn models_info(State(state): State<AppState>) -> Json<ModelsInfoResponse> {
    let models: IndexMap<String, ModelProfile> = state
        .registry
        .profiles()
        .map(|profile| (profile.id().to_string(), profile.clone()))
        .collect();
    Json(ModelsInfoResponse {
        total_models: models.len(),
        models,
    })
}
