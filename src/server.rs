//! Service wiring
//!
//! Everything read-only (model registry, agent catalog) is built once here and
//! handed to components by `Arc`.

use crate::agents::{AgentCatalog, AgentPipeline, AgentsService};
use crate::api::{build_router, AppState};
use crate::config::AppConfig;
use crate::context::slicer::SummarySlicer;
use crate::context::summarizer::SummarizationEngine;
use crate::conversation::ConversationOrchestrator;
use crate::llm::{CompletionClient, LlmService, OpenRouterClient};
use crate::registry::ModelRegistry;
use crate::storage::{ConversationStore, InMemoryStore};
use anyhow::Context;
use axum::Router;
use std::sync::Arc;
use tracing::info;

/// Build handler state around the given completion client and store
pub fn build_state(
    config: &AppConfig,
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn ConversationStore>,
) -> anyhow::Result<AppState> {
    let registry = Arc::new(
        ModelRegistry::with_extra(config.models.iter().cloned())
            .context("invalid model profiles in configuration")?,
    );
    registry
        .get(&config.summarization.model)
        .context("summarization model is not registered")?;

    let catalog = Arc::new(AgentCatalog::builtin());
    catalog
        .validate(&registry)
        .context("agent catalog references an unknown model")?;

    let llm = LlmService::new(client, registry.clone(), config.budget.clone());
    let summarizer = SummarizationEngine::new(llm.clone(), config.summarization.clone());
    let orchestrator = ConversationOrchestrator::new(
        store.clone(),
        llm.clone(),
        summarizer,
        config.conversation.clone(),
    );
    let agents = AgentsService::new(AgentPipeline::new(llm.clone(), catalog), store.clone());

    info!(models = registry.len(), "Model registry ready");

    Ok(AppState {
        slicer: SummarySlicer::new(registry.clone()),
        registry,
        store,
        llm,
        orchestrator,
        agents,
    })
}

/// Router with an injected completion client and a fresh in-memory store
pub fn build_app_with_client(
    config: &AppConfig,
    client: Arc<dyn CompletionClient>,
) -> anyhow::Result<Router> {
    let state = build_state(config, client, Arc::new(InMemoryStore::new()))?;
    Ok(build_router(state, config.server.max_body_bytes))
}

/// Router talking to the configured completion endpoint
pub fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let client = OpenRouterClient::new(&config.completion)
        .context("failed to build completion client")?;
    info!(endpoint = client.endpoint(), "Completion client ready");
    build_app_with_client(config, Arc::new(client))
}
