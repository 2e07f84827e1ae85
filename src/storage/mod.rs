//! Conversation persistence
//!
//! The core only talks to [`ConversationStore`]; durability is whatever the
//! implementation provides. [`InMemoryStore`] is the bundled implementation.

mod memory;

use crate::context::models::{ConversationMessage, NewMessage, StoredSummary, Thread};
use crate::context::summary::SummaryStore;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::InMemoryStore;

/// Storage collaborator for threads, messages and summaries
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_thread(&self, title: String, system_prompt: Option<String>) -> Result<Thread>;

    /// Fails with `ThreadNotFound` for unknown ids
    async fn get_thread(&self, thread_id: Uuid) -> Result<Thread>;

    /// Threads in creation order
    async fn list_threads(&self, skip: usize, limit: usize) -> Result<Vec<Thread>>;

    async fn update_system_prompt(
        &self,
        thread_id: Uuid,
        system_prompt: Option<String>,
    ) -> Result<Thread>;

    /// Delete a thread with its messages and summary
    async fn delete_thread(&self, thread_id: Uuid) -> Result<()>;

    /// Append a message; non-string content is rejected
    async fn append_message(
        &self,
        thread_id: Uuid,
        message: NewMessage,
    ) -> Result<ConversationMessage>;

    /// Messages in timestamp order, strictly after `since` when given
    async fn get_messages(
        &self,
        thread_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ConversationMessage>>;

    async fn get_summary(&self, thread_id: Uuid) -> Result<Option<StoredSummary>>;

    /// Replace the thread's summary.
    ///
    /// `covered_until` is the timestamp of the last summarized message; later
    /// messages stay pending even if they were stored before this call. When
    /// `None`, the summary covers everything up to now.
    async fn upsert_summary(
        &self,
        thread_id: Uuid,
        summary: SummaryStore,
        message_count: usize,
        covered_until: Option<DateTime<Utc>>,
    ) -> Result<StoredSummary>;

    /// Current summary plus every message it does not cover (all messages if none)
    async fn messages_since_summary(
        &self,
        thread_id: Uuid,
    ) -> Result<(Vec<ConversationMessage>, Option<StoredSummary>)> {
        let summary = self.get_summary(thread_id).await?;
        let since = summary.as_ref().map(|s| s.covered_until);
        let messages = self.get_messages(thread_id, since).await?;
        Ok((messages, summary))
    }
}
