//! Thread, message and summary handlers

use super::models::*;
use crate::agents::AgentsService;
use crate::context::slicer::SummarySlicer;
use crate::conversation::{ConversationOrchestrator, ProcessedMessage};
use crate::llm::LlmService;
use crate::metrics::METRICS;
use crate::registry::{ModelProfile, ModelRegistry};
use crate::storage::ConversationStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub store: Arc<dyn ConversationStore>,
    pub llm: LlmService,
    pub orchestrator: ConversationOrchestrator,
    pub agents: AgentsService,
    pub slicer: SummarySlicer,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics
pub async fn metrics() -> String {
    METRICS.export_prometheus()
}

/// List registered model profiles
///
/// GET /api/v1/models
pub async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelProfile>> {
    Json(state.registry.profiles().cloned().collect())
}

/// POST /api/v1/threads
pub async fn create_thread(
    State(state): State<AppState>,
    Json(request): Json<CreateThreadRequest>,
) -> Result<(StatusCode, Json<crate::context::Thread>), ApiFailure> {
    if request.title.trim().is_empty() {
        return Err(validation_error("Title cannot be empty"));
    }

    let thread = state
        .store
        .create_thread(request.title, request.system_prompt)
        .await
        .map_err(error_response)?;
    info!(thread_id = %thread.id, "Thread created");
    Ok((StatusCode::CREATED, Json(thread)))
}

/// GET /api/v1/threads?skip=&limit=
pub async fn list_threads(
    State(state): State<AppState>,
    Query(query): Query<ListThreadsQuery>,
) -> ApiResult<Vec<crate::context::Thread>> {
    state
        .store
        .list_threads(query.skip, query.limit)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /api/v1/threads/:id
pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> ApiResult<ThreadDetails> {
    let thread = state.store.get_thread(thread_id).await.map_err(error_response)?;
    let messages = state
        .store
        .get_messages(thread_id, None)
        .await
        .map_err(error_response)?;
    let summary = state.store.get_summary(thread_id).await.map_err(error_response)?;

    Ok(Json(ThreadDetails {
        thread,
        messages,
        summary,
    }))
}

/// PATCH /api/v1/threads/:id
pub async fn update_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Json(request): Json<UpdateThreadRequest>,
) -> ApiResult<crate::context::Thread> {
    state
        .store
        .update_system_prompt(thread_id, request.system_prompt)
        .await
        .map(Json)
        .map_err(error_response)
}

/// DELETE /api/v1/threads/:id
pub async fn delete_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> Result<StatusCode, ApiFailure> {
    state
        .store
        .delete_thread(thread_id)
        .await
        .map_err(error_response)?;
    info!(thread_id = %thread_id, "Thread deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Send a user message and get the model's reply
///
/// POST /api/v1/threads/:id/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ProcessedMessage>), ApiFailure> {
    let model = request.model().to_string();
    let processed = state
        .orchestrator
        .process_user_message(thread_id, &model, &request.sender, request.content)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(processed)))
}

/// GET /api/v1/threads/:id/messages
pub async fn list_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> ApiResult<Vec<crate::context::ConversationMessage>> {
    state
        .store
        .get_messages(thread_id, None)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Current summary, optionally sliced for a model
///
/// GET /api/v1/threads/:id/summary?model=
pub async fn get_summary(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<SummaryResponse> {
    let stored = state
        .store
        .get_summary(thread_id)
        .await
        .map_err(error_response)?;
    let Some(stored) = stored else {
        // distinguish "no summary yet" from "no such thread"
        state.store.get_thread(thread_id).await.map_err(error_response)?;
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::new(
                "SUMMARY_NOT_FOUND",
                format!("Thread {} has no summary yet", thread_id),
            )),
        ));
    };

    let (summary, text) = match &query.model {
        Some(model) => {
            let slice = state
                .slicer
                .for_model(&stored.summary, model)
                .map_err(error_response)?;
            (slice.to_value(), slice.to_text())
        }
        None => (stored.summary.to_value(), stored.summary.to_text()),
    };

    Ok(Json(SummaryResponse {
        thread_id,
        summary,
        text,
        message_count: stored.message_count,
        created_at: stored.created_at,
        covered_until: stored.covered_until,
        model: query.model,
    }))
}
