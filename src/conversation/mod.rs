//! Message handling on conversation threads

pub mod orchestrator;

pub use orchestrator::{
    ConversationOrchestrator, ProcessedMessage, SummarizationReport, SUMMARY_HEADER,
};
