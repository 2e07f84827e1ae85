//! Agent roles and their model bindings

use crate::error::{ContextError, Result};
use crate::registry::{KnownModel, ModelRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role an agent plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Coordinator,
    Specialist,
    Evaluator,
    Summarizer,
    Researcher,
    /// Final pipeline stage; not selectable by callers
    Synthesizer,
}

impl AgentRole {
    /// Roles callers may invoke directly or in teams
    pub const SELECTABLE: [AgentRole; 5] = [
        AgentRole::Coordinator,
        AgentRole::Specialist,
        AgentRole::Evaluator,
        AgentRole::Summarizer,
        AgentRole::Researcher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Coordinator => "coordinator",
            AgentRole::Specialist => "specialist",
            AgentRole::Evaluator => "evaluator",
            AgentRole::Summarizer => "summarizer",
            AgentRole::Researcher => "researcher",
            AgentRole::Synthesizer => "synthesizer",
        }
    }

    pub fn is_selectable(&self) -> bool {
        !matches!(self, AgentRole::Synthesizer)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self> {
        AgentRole::SELECTABLE
            .into_iter()
            .chain([AgentRole::Synthesizer])
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ContextError::UnknownAgent(s.to_string()))
    }
}

/// One agent: a role bound to a model, prompt and sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    pub role: AgentRole,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
    #[serde(default)]
    pub description: String,
}

/// Public view of an agent, without its prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub role: AgentRole,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl From<&AgentDefinition> for AgentInfo {
    fn from(def: &AgentDefinition) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            role: def.role,
            model: def.model.clone(),
            temperature: def.temperature,
            max_tokens: def.max_tokens,
        }
    }
}

const COORDINATOR_PROMPT: &str = "You are a coordinator agent. Your job is to:
1. Understand the user's request
2. Break down complex tasks into sub-tasks
3. Delegate to specialist agents
4. Synthesize responses from multiple agents
5. Ensure consistency across agent outputs

Be concise and focus on delegating work effectively.";

const SPECIALIST_PROMPT: &str = "You are a specialist agent. Your job is to:
1. Focus on specific domains or tasks
2. Provide detailed, expert-level responses
3. Handle complex problem-solving
4. Suggest improvements and optimizations

Be thorough and provide comprehensive analysis.";

const EVALUATOR_PROMPT: &str = "You are an evaluator agent. Your job is to:
1. Review responses from other agents
2. Check for accuracy and quality
3. Identify inconsistencies or gaps
4. Provide critical feedback and improvements
5. Rate response quality on a scale

Be objective and fair in your evaluations.";

const SUMMARIZER_PROMPT: &str = "You are a summarizer agent. Your job is to:
1. Extract key points from discussions
2. Create concise summaries
3. Highlight important decisions
4. Maintain context while being brief

Be concise and capture the essence.";

const RESEARCHER_PROMPT: &str = "You are a research agent. Your job is to:
1. Gather information on topics
2. Analyze different perspectives
3. Provide comprehensive background
4. Identify patterns and connections

Be thorough and cite your reasoning.";

const SYNTHESIZER_PROMPT: &str =
    "You are a master synthesizer. Combine all information into clear, coherent responses.";

fn definition(
    name: &str,
    role: AgentRole,
    model: KnownModel,
    system_prompt: &str,
    temperature: f32,
    max_tokens: usize,
    description: &str,
) -> AgentDefinition {
    AgentDefinition {
        name: name.to_string(),
        role,
        model: model.as_str().to_string(),
        system_prompt: system_prompt.to_string(),
        temperature,
        max_tokens,
        description: description.to_string(),
    }
}

/// Read-only set of agent definitions, built once and shared
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: IndexMap<AgentRole, AgentDefinition>,
}

impl AgentCatalog {
    /// Build a catalog; every selectable role and the synthesizer must be present
    pub fn new(definitions: impl IntoIterator<Item = AgentDefinition>) -> Result<Self> {
        let agents: IndexMap<AgentRole, AgentDefinition> = definitions
            .into_iter()
            .map(|def| (def.role, def))
            .collect();

        if let Some(missing) = AgentRole::SELECTABLE
            .into_iter()
            .chain([AgentRole::Synthesizer])
            .find(|role| !agents.contains_key(role))
        {
            return Err(ContextError::Configuration(format!(
                "Agent catalog has no definition for role {}",
                missing
            )));
        }

        Ok(Self { agents })
    }

    pub fn builtin() -> Self {
        let agents = [
            definition(
                "Coordinator",
                AgentRole::Coordinator,
                KnownModel::Gpt4Turbo,
                COORDINATOR_PROMPT,
                0.5,
                500,
                "Orchestrates other agents and coordinates workflows",
            ),
            definition(
                "Specialist",
                AgentRole::Specialist,
                KnownModel::Mistral7b,
                SPECIALIST_PROMPT,
                0.7,
                1500,
                "Provides specialized expertise on specific topics",
            ),
            definition(
                "Evaluator",
                AgentRole::Evaluator,
                KnownModel::Gpt4Turbo,
                EVALUATOR_PROMPT,
                0.3,
                800,
                "Evaluates and quality-checks agent outputs",
            ),
            definition(
                "Summarizer",
                AgentRole::Summarizer,
                KnownModel::Gpt35Turbo,
                SUMMARIZER_PROMPT,
                0.4,
                600,
                "Summarizes conversations and extracts key information",
            ),
            definition(
                "Researcher",
                AgentRole::Researcher,
                KnownModel::Mistral7b,
                RESEARCHER_PROMPT,
                0.6,
                1500,
                "Researches topics and provides comprehensive analysis",
            ),
            definition(
                "Synthesizer",
                AgentRole::Synthesizer,
                KnownModel::GeminiPro,
                SYNTHESIZER_PROMPT,
                0.5,
                1500,
                "Combines pipeline outputs into the final response",
            ),
        ];

        Self {
            agents: agents.into_iter().map(|def| (def.role, def)).collect(),
        }
    }

    /// Fails when any agent is bound to a model the registry does not know
    pub fn validate(&self, registry: &ModelRegistry) -> Result<()> {
        for def in self.agents.values() {
            registry.get(&def.model)?;
        }
        Ok(())
    }

    pub fn get(&self, role: AgentRole) -> Result<&AgentDefinition> {
        self.agents
            .get(&role)
            .ok_or_else(|| ContextError::UnknownAgent(role.to_string()))
    }

    /// Like [`get`](Self::get) but refuses roles callers may not pick
    pub fn selectable(&self, role: AgentRole) -> Result<&AgentDefinition> {
        if !role.is_selectable() {
            return Err(ContextError::UnknownAgent(role.to_string()));
        }
        self.get(role)
    }

    /// Selectable agents keyed by role name, in catalog order
    pub fn list(&self) -> IndexMap<String, AgentInfo> {
        self.agents
            .values()
            .filter(|def| def.role.is_selectable())
            .map(|def| (def.role.to_string(), AgentInfo::from(def)))
            .collect()
    }
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
