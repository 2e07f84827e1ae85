//! Agent endpoints

use super::handlers::AppState;
use super::models::*;
use crate::agents::{AgentInfo, ThreadAgentResult, WorkflowState};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use indexmap::IndexMap;
use tracing::info;
use uuid::Uuid;

/// GET /api/v1/agents
pub async fn list_agents(State(state): State<AppState>) -> Json<IndexMap<String, AgentInfo>> {
    Json(state.agents.pipeline().catalog().list())
}

/// Run one agent on the input
///
/// POST /api/v1/agents/single
pub async fn run_single(
    State(state): State<AppState>,
    Json(request): Json<AgentRequest>,
) -> ApiResult<AgentResponse> {
    if request.content.trim().is_empty() {
        return Err(validation_error("Content cannot be empty"));
    }
    let pipeline = state.agents.pipeline();
    let agent = pipeline
        .catalog()
        .selectable(request.agent_role)
        .map_err(error_response)?;
    let model_used = agent.model.clone();

    let response = pipeline
        .run_single_agent(&request.content, request.agent_role, request.context.as_ref())
        .await
        .map_err(error_response)?;

    Ok(Json(AgentResponse {
        agent_role: request.agent_role,
        response,
        model_used,
        timestamp: Utc::now(),
    }))
}

/// Run several agents in turn on the same input
///
/// POST /api/v1/agents/team
pub async fn run_team(
    State(state): State<AppState>,
    Json(request): Json<AgentTeamRequest>,
) -> ApiResult<AgentTeamResponse> {
    if request.agent_roles.is_empty() {
        return Err(validation_error("agent_roles cannot be empty"));
    }
    let outputs = state
        .agents
        .pipeline()
        .run_team(&request.content, &request.agent_roles, request.context.as_ref())
        .await
        .map_err(error_response)?;

    Ok(Json(AgentTeamResponse {
        agents_used: request.agent_roles,
        outputs,
        timestamp: Utc::now(),
    }))
}

/// Run the four-stage workflow
///
/// POST /api/v1/agents/workflow
pub async fn run_workflow(
    State(state): State<AppState>,
    Json(request): Json<WorkflowRequest>,
) -> ApiResult<WorkflowState> {
    if request.content.trim().is_empty() {
        return Err(validation_error("Content cannot be empty"));
    }
    info!("Agent workflow request");
    state
        .agents
        .pipeline()
        .run_workflow(&request.content)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Answer a thread message with agents and save both sides to the thread
///
/// POST /api/v1/threads/:id/agents
pub async fn thread_agents(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Json(request): Json<ThreadAgentsRequest>,
) -> ApiResult<ThreadAgentResult> {
    state
        .agents
        .process_thread_message(
            thread_id,
            &request.content,
            request.agent_roles,
            request.use_workflow,
        )
        .await
        .map(Json)
        .map_err(error_response)
}
