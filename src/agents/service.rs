//! Agent runs bound to a conversation thread

use super::definitions::AgentRole;
use super::pipeline::{AgentPipeline, Stage, WorkflowState};
use crate::context::models::{ConversationMessage, NewMessage};
use crate::error::Result;
use crate::storage::ConversationStore;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Sender label of persisted agent-run responses
pub const TEAM_SENDER: &str = "MultiAgentTeam";

/// How a thread message was answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AgentRun {
    Workflow(WorkflowState),
    Team {
        agents_used: Vec<AgentRole>,
        agent_outputs: IndexMap<String, String>,
    },
}

impl AgentRun {
    /// Roles credited in the persisted message's `model_used`
    pub fn roles(&self) -> Vec<&'static str> {
        match self {
            AgentRun::Workflow(_) => Stage::ORDER.iter().map(Stage::as_str).collect(),
            AgentRun::Team { agents_used, .. } => {
                agents_used.iter().map(AgentRole::as_str).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadAgentResult {
    pub user_input: String,
    pub run: AgentRun,
    pub final_response: String,
    pub saved_to_thread: bool,
    pub user_message: ConversationMessage,
    pub agent_message: ConversationMessage,
}

/// Agent runs that read thread context and write results back to the thread
#[derive(Clone)]
pub struct AgentsService {
    pipeline: AgentPipeline,
    store: Arc<dyn ConversationStore>,
}

impl AgentsService {
    pub fn new(pipeline: AgentPipeline, store: Arc<dyn ConversationStore>) -> Self {
        Self { pipeline, store }
    }

    pub fn pipeline(&self) -> &AgentPipeline {
        &self.pipeline
    }

    async fn thread_context(&self, thread_id: Uuid) -> Result<serde_json::Value> {
        let thread = self.store.get_thread(thread_id).await?;
        let mut context = json!({
            "thread_id": thread.id,
            "thread_title": thread.title,
            "system_prompt": thread.system_prompt,
        });
        if let Some(summary) = self.store.get_summary(thread_id).await? {
            context["last_summary"] = json!(summary.summary.to_text());
        }
        Ok(context)
    }

    /// Answer `input` with agents and persist both sides to the thread.
    ///
    /// Workflow mode runs the full pipeline without thread context. Otherwise
    /// the roles (default: specialist) run as a team with the thread context,
    /// and the first role's output is the response. Nothing is persisted when
    /// an agent call fails.
    pub async fn process_thread_message(
        &self,
        thread_id: Uuid,
        input: &str,
        roles: Option<Vec<AgentRole>>,
        use_workflow: bool,
    ) -> Result<ThreadAgentResult> {
        let context = self.thread_context(thread_id).await?;

        let (run, final_response) = if use_workflow {
            let state = self.pipeline.run_workflow(input).await?;
            let final_response = state
                .final_response
                .clone()
                .unwrap_or_else(|| input.to_string());
            (AgentRun::Workflow(state), final_response)
        } else {
            let roles = match roles {
                Some(roles) if !roles.is_empty() => roles,
                _ => vec![AgentRole::Specialist],
            };
            let outputs = self.pipeline.run_team(input, &roles, Some(&context)).await?;
            let final_response = outputs
                .get(roles[0].as_str())
                .cloned()
                .unwrap_or_default();
            (
                AgentRun::Team {
                    agents_used: roles,
                    agent_outputs: outputs,
                },
                final_response,
            )
        };

        let user_message = self
            .store
            .append_message(thread_id, NewMessage::user("User", input))
            .await?;
        let model_used = format!("agents:{}", run.roles().join(","));
        let agent_message = self
            .store
            .append_message(
                thread_id,
                NewMessage::agent(TEAM_SENDER, final_response.clone(), model_used),
            )
            .await?;

        info!(thread_id = %thread_id, agents = ?run.roles(), "Saved agent response to thread");

        Ok(ThreadAgentResult {
            user_input: input.to_string(),
            run,
            final_response,
            saved_to_thread: true,
            user_message,
            agent_message,
        })
    }
}
