//! In-memory conversation store

use super::ConversationStore;
use crate::context::models::{ConversationMessage, NewMessage, StoredSummary, Thread};
use crate::context::summary::SummaryStore;
use crate::error::{ContextError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

struct ThreadRecord {
    thread: Thread,
    messages: Vec<ConversationMessage>,
    summary: Option<StoredSummary>,
}

/// Conversation store backed by a concurrent map.
///
/// Timestamps issued by one store are strictly increasing, so "messages after
/// the summary" is well defined even within the same clock tick.
pub struct InMemoryStore {
    threads: DashMap<Uuid, ThreadRecord>,
    clock: Mutex<DateTime<Utc>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            threads: DashMap::new(),
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    fn next_timestamp(&self) -> Result<DateTime<Utc>> {
        let mut last = self
            .clock
            .lock()
            .map_err(|_| ContextError::Storage("Timestamp clock poisoned".to_string()))?;
        let now = Utc::now();
        let next = if now > *last {
            now
        } else {
            *last + Duration::microseconds(1)
        };
        *last = next;
        Ok(next)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn create_thread(&self, title: String, system_prompt: Option<String>) -> Result<Thread> {
        let now = self.next_timestamp()?;
        let thread = Thread {
            id: Uuid::new_v4(),
            title,
            system_prompt,
            created_at: now,
            updated_at: now,
        };
        self.threads.insert(
            thread.id,
            ThreadRecord {
                thread: thread.clone(),
                messages: Vec::new(),
                summary: None,
            },
        );
        debug!(thread_id = %thread.id, "Created thread");
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: Uuid) -> Result<Thread> {
        self.threads
            .get(&thread_id)
            .map(|record| record.thread.clone())
            .ok_or(ContextError::ThreadNotFound(thread_id))
    }

    async fn list_threads(&self, skip: usize, limit: usize) -> Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self
            .threads
            .iter()
            .map(|record| record.thread.clone())
            .collect();
        threads.sort_by_key(|thread| thread.created_at);
        Ok(threads.into_iter().skip(skip).take(limit).collect())
    }

    async fn update_system_prompt(
        &self,
        thread_id: Uuid,
        system_prompt: Option<String>,
    ) -> Result<Thread> {
        let now = self.next_timestamp()?;
        let mut record = self
            .threads
            .get_mut(&thread_id)
            .ok_or(ContextError::ThreadNotFound(thread_id))?;
        record.thread.system_prompt = system_prompt;
        record.thread.updated_at = now;
        Ok(record.thread.clone())
    }

    async fn delete_thread(&self, thread_id: Uuid) -> Result<()> {
        self.threads
            .remove(&thread_id)
            .map(|_| ())
            .ok_or(ContextError::ThreadNotFound(thread_id))
    }

    async fn append_message(
        &self,
        thread_id: Uuid,
        message: NewMessage,
    ) -> Result<ConversationMessage> {
        let content = message.text()?.to_string();
        let timestamp = self.next_timestamp()?;

        let mut record = self
            .threads
            .get_mut(&thread_id)
            .ok_or(ContextError::ThreadNotFound(thread_id))?;

        let stored = ConversationMessage {
            id: Uuid::new_v4(),
            thread_id,
            sender: message.sender,
            role: message.role,
            content,
            timestamp,
            model_used: message.model_used,
        };
        record.messages.push(stored.clone());
        record.thread.updated_at = timestamp;
        Ok(stored)
    }

    async fn get_messages(
        &self,
        thread_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ConversationMessage>> {
        let record = self
            .threads
            .get(&thread_id)
            .ok_or(ContextError::ThreadNotFound(thread_id))?;

        Ok(record
            .messages
            .iter()
            .filter(|msg| since.map_or(true, |since| msg.timestamp > since))
            .cloned()
            .collect())
    }

    async fn get_summary(&self, thread_id: Uuid) -> Result<Option<StoredSummary>> {
        let record = self
            .threads
            .get(&thread_id)
            .ok_or(ContextError::ThreadNotFound(thread_id))?;
        Ok(record.summary.clone())
    }

    async fn upsert_summary(
        &self,
        thread_id: Uuid,
        summary: SummaryStore,
        message_count: usize,
        covered_until: Option<DateTime<Utc>>,
    ) -> Result<StoredSummary> {
        let created_at = self.next_timestamp()?;
        let mut record = self
            .threads
            .get_mut(&thread_id)
            .ok_or(ContextError::ThreadNotFound(thread_id))?;

        let stored = StoredSummary {
            thread_id,
            summary,
            message_count,
            created_at,
            covered_until: covered_until.unwrap_or(created_at),
        };
        record.summary = Some(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::models::MessageRole;
    use serde_json::json;

    #[tokio::test]
    async fn test_thread_lifecycle() {
        let store = InMemoryStore::new();
        let thread = store
            .create_thread("Planning".into(), Some("Be terse".into()))
            .await
            .unwrap();

        let fetched = store.get_thread(thread.id).await.unwrap();
        assert_eq!(fetched.title, "Planning");

        let updated = store.update_system_prompt(thread.id, None).await.unwrap();
        assert!(updated.system_prompt.is_none());
        assert!(updated.updated_at > thread.updated_at);

        store.delete_thread(thread.id).await.unwrap();
        assert!(matches!(
            store.get_thread(thread.id).await,
            Err(ContextError::ThreadNotFound(_))
        ));
        assert!(store.delete_thread(thread.id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_threads_paginates_in_creation_order() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store.create_thread(format!("t{}", i), None).await.unwrap();
        }
        let page = store.list_threads(1, 2).await.unwrap();
        let titles: Vec<&str> = page.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_append_rejects_non_string_content() {
        let store = InMemoryStore::new();
        let thread = store.create_thread("t".into(), None).await.unwrap();

        let err = store
            .append_message(
                thread.id,
                NewMessage::new("alice", MessageRole::User, json!(["not", "text"])),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidMessageContent { .. }));
        assert!(store.get_messages(thread.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_to_unknown_thread() {
        let store = InMemoryStore::new();
        let err = store
            .append_message(Uuid::new_v4(), NewMessage::user("alice", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::ThreadNotFound(_)));
    }

    #[tokio::test]
    async fn test_messages_after_summary() {
        let store = InMemoryStore::new();
        let thread = store.create_thread("t".into(), None).await.unwrap();

        store
            .append_message(thread.id, NewMessage::user("alice", "one"))
            .await
            .unwrap();
        store
            .append_message(thread.id, NewMessage::agent("Agent", "two", "openai/gpt-4"))
            .await
            .unwrap();

        let (before, summary) = store.messages_since_summary(thread.id).await.unwrap();
        assert_eq!(before.len(), 2);
        assert!(summary.is_none());

        store
            .upsert_summary(thread.id, SummaryStore::empty(), 2, None)
            .await
            .unwrap();
        store
            .append_message(thread.id, NewMessage::user("alice", "three"))
            .await
            .unwrap();

        let (after, summary) = store.messages_since_summary(thread.id).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].content, "three");
        assert_eq!(summary.unwrap().message_count, 2);
    }

    #[tokio::test]
    async fn test_summary_watermark_keeps_late_messages_pending() {
        let store = InMemoryStore::new();
        let thread = store.create_thread("t".into(), None).await.unwrap();
        store
            .append_message(thread.id, NewMessage::user("alice", "one"))
            .await
            .unwrap();
        let last = store
            .append_message(thread.id, NewMessage::agent("Agent", "two", "openai/gpt-4"))
            .await
            .unwrap();

        let (summarized, _) = store.messages_since_summary(thread.id).await.unwrap();
        // lands while the summary is being produced
        store
            .append_message(thread.id, NewMessage::user("alice", "three"))
            .await
            .unwrap();
        let stored = store
            .upsert_summary(
                thread.id,
                SummaryStore::empty(),
                summarized.len(),
                Some(last.timestamp),
            )
            .await
            .unwrap();

        assert_eq!(stored.covered_until, last.timestamp);
        assert!(stored.created_at > stored.covered_until);
        let (pending, _) = store.messages_since_summary(thread.id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content, "three");
    }

    #[tokio::test]
    async fn test_upsert_replaces_summary() {
        let store = InMemoryStore::new();
        let thread = store.create_thread("t".into(), None).await.unwrap();

        let first = store
            .upsert_summary(thread.id, SummaryStore::empty(), 4, None)
            .await
            .unwrap();
        let replacement = SummaryStore::from_value(json!({"core_facts": ["new"]}));
        let second = store
            .upsert_summary(thread.id, replacement.clone(), 6, None)
            .await
            .unwrap();

        assert!(second.created_at > first.created_at);
        assert_eq!(second.covered_until, second.created_at);
        let current = store.get_summary(thread.id).await.unwrap().unwrap();
        assert_eq!(current.summary, replacement);
        assert_eq!(current.message_count, 6);
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let store = InMemoryStore::new();
        let thread = store.create_thread("t".into(), None).await.unwrap();
        for i in 0..50 {
            store
                .append_message(thread.id, NewMessage::user("alice", format!("m{}", i)))
                .await
                .unwrap();
        }
        let messages = store.get_messages(thread.id, None).await.unwrap();
        assert!(messages.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
