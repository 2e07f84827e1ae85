//! Fixed four-stage agent workflow
//!
//! The workflow is a small state machine: [`Stage::ORDER`] lists the stages,
//! [`AgentPipeline::step`] runs the current stage against the accumulated
//! [`WorkflowState`] and advances it. Specialist calls for separate tasks run
//! concurrently and are joined back by task index.

use super::definitions::{AgentCatalog, AgentDefinition, AgentRole};
use crate::context::models::ChatMessage;
use crate::error::Result;
use crate::llm::{GenerateOptions, LlmService};
use crate::metrics::METRICS;
use crate::time_operation;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Workflow position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Coordinator,
    Specialist,
    Evaluator,
    Synthesizer,
    Done,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [
        Stage::Coordinator,
        Stage::Specialist,
        Stage::Evaluator,
        Stage::Synthesizer,
    ];

    pub fn next(self) -> Stage {
        match self {
            Stage::Coordinator => Stage::Specialist,
            Stage::Specialist => Stage::Evaluator,
            Stage::Evaluator => Stage::Synthesizer,
            Stage::Synthesizer | Stage::Done => Stage::Done,
        }
    }

    /// Agent that runs this stage
    pub fn role(self) -> Option<AgentRole> {
        match self {
            Stage::Coordinator => Some(AgentRole::Coordinator),
            Stage::Specialist => Some(AgentRole::Specialist),
            Stage::Evaluator => Some(AgentRole::Evaluator),
            Stage::Synthesizer => Some(AgentRole::Synthesizer),
            Stage::Done => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Coordinator => "coordinator",
            Stage::Specialist => "specialist",
            Stage::Evaluator => "evaluator",
            Stage::Synthesizer => "synthesizer",
            Stage::Done => "done",
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::Coordinator
    }
}

/// What a stage produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageOutput {
    Text(String),
    Keyed(IndexMap<String, String>),
}

/// One entry of the append-only workflow history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub agent: String,
    pub output: StageOutput,
    pub timestamp: DateTime<Utc>,
}

/// State threaded through the stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub user_input: String,
    pub stage: Stage,
    pub coordinator_task: Option<String>,
    pub task_breakdown: Vec<String>,
    pub specialist_outputs: IndexMap<String, String>,
    pub evaluator_feedback: Option<String>,
    pub final_response: Option<String>,
    pub workflow_history: Vec<WorkflowRecord>,
}

impl WorkflowState {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Self::default()
        }
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    fn record(&mut self, stage: Stage, output: StageOutput) {
        self.workflow_history.push(WorkflowRecord {
            agent: stage.as_str().to_string(),
            output,
            timestamp: Utc::now(),
        });
    }
}

/// Task list from a coordinator response.
///
/// Tries the span from the first `[` to the last `]` as a JSON array, then
/// falls back to non-empty lines, then to the whole response.
pub fn extract_tasks(response: &str) -> Vec<String> {
    if let (Some(start), Some(end)) = (response.find('['), response.rfind(']')) {
        if start < end {
            if let Ok(serde_json::Value::Array(items)) =
                serde_json::from_str::<serde_json::Value>(&response[start..=end])
            {
                return items
                    .into_iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect();
            }
        }
    }

    let lines: Vec<String> = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if lines.is_empty() {
        vec![response.to_string()]
    } else {
        lines
    }
}

fn coordinator_prompt(input: &str) -> String {
    format!(
        "User request: {}\n\n\
         Please break this down into specific, actionable tasks for specialist agents.\n\
         Format your response as a JSON list with task descriptions.",
        input
    )
}

fn specialist_prompt(input: &str, task: &str) -> String {
    format!(
        "Original request: {}\n\n\
         Task to handle: {}\n\n\
         Please provide a detailed, expert response to this task.",
        input, task
    )
}

fn evaluator_prompt(input: &str, outputs: &IndexMap<String, String>) -> String {
    let responses = outputs
        .values()
        .enumerate()
        .map(|(idx, output)| format!("Task {}: {}", idx, output))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Original request: {}\n\n\
         Specialist responses:\n{}\n\n\
         Please evaluate the quality and completeness of these responses.\n\
         Provide constructive feedback and suggestions for improvement.",
        input, responses
    )
}

fn synthesizer_prompt(input: &str, outputs: &IndexMap<String, String>, feedback: &str) -> String {
    let responses = outputs
        .iter()
        .map(|(key, output)| format!("{}: {}", key, output))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Original request: {}\n\n\
         Specialist responses:\n{}\n\n\
         Evaluator feedback:\n{}\n\n\
         Please synthesize all this information into a comprehensive, coherent final response.",
        input, responses, feedback
    )
}

/// Runs agents against the completion service
#[derive(Clone)]
pub struct AgentPipeline {
    llm: LlmService,
    catalog: Arc<AgentCatalog>,
}

impl AgentPipeline {
    pub fn new(llm: LlmService, catalog: Arc<AgentCatalog>) -> Self {
        Self { llm, catalog }
    }

    pub fn catalog(&self) -> &Arc<AgentCatalog> {
        &self.catalog
    }

    async fn call(&self, agent: &AgentDefinition, prompt: String) -> Result<String> {
        let options = GenerateOptions::new(agent.temperature, agent.max_tokens);
        let response = self
            .llm
            .generate(
                &agent.model,
                &agent.system_prompt,
                &[ChatMessage::user(prompt)],
                options,
            )
            .await?;
        Ok(response.text)
    }

    /// Run one agent directly on raw input, with optional JSON context
    pub async fn run_single_agent(
        &self,
        input: &str,
        role: AgentRole,
        context: Option<&serde_json::Value>,
    ) -> Result<String> {
        let agent = self.catalog.selectable(role)?;
        let prompt = match context {
            Some(context) => format!(
                "Context: {}\n\nUser input: {}",
                serde_json::to_string(context)?,
                input
            ),
            None => format!("User input: {}", input),
        };
        debug!(role = %role, model = %agent.model, "Running single agent");
        self.call(agent, prompt).await
    }

    /// Run each role in turn on the same input; results keyed by role
    pub async fn run_team(
        &self,
        input: &str,
        roles: &[AgentRole],
        context: Option<&serde_json::Value>,
    ) -> Result<IndexMap<String, String>> {
        let mut outputs = IndexMap::new();
        for role in roles {
            let output = self.run_single_agent(input, *role, context).await?;
            outputs.insert(role.to_string(), output);
        }
        Ok(outputs)
    }

    /// Run the current stage and advance; a finished state is returned as is
    pub async fn step(&self, mut state: WorkflowState) -> Result<WorkflowState> {
        let stage = state.stage;
        let Some(role) = stage.role() else {
            return Ok(state);
        };
        let agent = self.catalog.get(role)?;

        match stage {
            Stage::Coordinator => {
                let response = self.call(agent, coordinator_prompt(&state.user_input)).await?;
                state.task_breakdown = extract_tasks(&response);
                state.coordinator_task = Some(response.clone());
                state.record(stage, StageOutput::Text(response));
            }
            Stage::Specialist => {
                let calls = state.task_breakdown.iter().map(|task| {
                    self.call(agent, specialist_prompt(&state.user_input, task))
                });
                let outputs: IndexMap<String, String> = try_join_all(calls)
                    .await?
                    .into_iter()
                    .enumerate()
                    .map(|(idx, output)| (format!("task_{}", idx), output))
                    .collect();
                state.specialist_outputs = outputs.clone();
                state.record(stage, StageOutput::Keyed(outputs));
            }
            Stage::Evaluator => {
                let prompt = evaluator_prompt(&state.user_input, &state.specialist_outputs);
                let feedback = self.call(agent, prompt).await?;
                state.evaluator_feedback = Some(feedback.clone());
                state.record(stage, StageOutput::Text(feedback));
            }
            Stage::Synthesizer => {
                let prompt = synthesizer_prompt(
                    &state.user_input,
                    &state.specialist_outputs,
                    state.evaluator_feedback.as_deref().unwrap_or_default(),
                );
                let response = self.call(agent, prompt).await?;
                state.final_response = Some(response.clone());
                state.record(stage, StageOutput::Text(response));
            }
            Stage::Done => {}
        }

        state.stage = stage.next();
        Ok(state)
    }

    /// Run the whole workflow; any failed stage aborts it
    pub async fn run_workflow(&self, input: &str) -> Result<WorkflowState> {
        let mut state = WorkflowState::new(input);
        info!("Starting agent workflow");

        while !state.is_done() {
            let stage = state.stage;
            state = time_operation!(
                METRICS.pipeline_stage_duration,
                stage.as_str(),
                self.step(state).await?
            );
            debug!(stage = stage.as_str(), "Workflow stage completed");
        }

        info!(
            tasks = state.task_breakdown.len(),
            "Agent workflow completed"
        );
        Ok(state)
    }
}
