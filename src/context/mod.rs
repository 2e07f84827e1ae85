//! Conversation context management
//!
//! Token estimation, budget tracking, message cleaning, and the structured
//! rolling summary with its slicing and summarization engine.

pub mod cleaner;
pub mod models;
pub mod slicer;
pub mod summarizer;
pub mod summary;
pub mod token_budget;
pub mod token_estimator;

pub use cleaner::{CleanerConfig, CleaningReport, FilterReport, MessageCleaner, TrimReport};
pub use models::{
    ChatMessage, ChatRole, ConversationMessage, MessageRole, NewMessage, StoredSummary, Thread,
};
pub use slicer::{categories_for, SummarySlice, SummarySlicer};
pub use summarizer::{SummarizationEngine, SummaryOutcome};
pub use summary::{SummaryCategory, SummaryStats, SummaryStore};
pub use token_budget::{
    validate_usage, BudgetError, BudgetStatus, BudgetValidation, ContextBudget, UsageEntry,
    WarningLevel,
};
pub use token_estimator::{
    estimate, estimate_conversation, truncate_to_tokens, TokenEstimator, WordBasedEstimator,
};
