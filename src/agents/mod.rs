//! Multi-agent response generation
//!
//! Agents are role-specific model bindings from an [`AgentCatalog`]. They run
//! alone, as a sequential team, or through the fixed four-stage workflow of
//! [`AgentPipeline`].

pub mod definitions;
pub mod pipeline;
pub mod service;

pub use definitions::{AgentCatalog, AgentDefinition, AgentInfo, AgentRole};
pub use pipeline::{
    extract_tasks, AgentPipeline, Stage, StageOutput, WorkflowRecord, WorkflowState,
};
pub use service::{AgentRun, AgentsService, ThreadAgentResult, TEAM_SENDER};
