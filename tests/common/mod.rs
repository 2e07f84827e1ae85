//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chat_context::config::{BudgetConfig, ConversationConfig, SummarizationConfig};
use chat_context::context::SummarizationEngine;
use chat_context::conversation::ConversationOrchestrator;
use chat_context::llm::{
    Completion, CompletionClient, CompletionError, CompletionRequest, LlmService,
};
use chat_context::registry::ModelRegistry;
use chat_context::storage::InMemoryStore;
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync;

/// Completion client answering from a closure and recording requests
pub struct FakeCompletions {
    responder: Box<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeCompletions {
    pub fn new(
        responder: impl Fn(&CompletionRequest) -> Result<String, CompletionError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answers summarization calls with a fixed summary and everything else with `reply`
    pub fn chatty(reply: &'static str) -> Arc<Self> {
        Self::new(move |request| {
            if is_summary_request(request) {
                Ok(SUMMARY_JSON.to_string())
            } else {
                Ok(reply.to_string())
            }
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn chat_requests(&self) -> Vec<CompletionRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !is_summary_request(r))
            .collect()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletions {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request).map(Completion::text)
    }
}

pub const SUMMARY_JSON: &str = r#"{
    "core_facts": ["User is planning a trip to Lisbon"],
    "user_preferences": ["Prefers trains over flights"],
    "decisions_made": ["Travel in May"],
    "open_questions": ["Which hotel?"]
}"#;

pub fn is_summary_request(request: &CompletionRequest) -> bool {
    request
        .system_prompt
        .contains("structured, comprehensive summaries")
}

pub fn orchestrator(
    client: Arc<FakeCompletions>,
    store: Arc<InMemoryStore>,
) -> ConversationOrchestrator {
    let llm = LlmService::new(
        client,
        Arc::new(ModelRegistry::builtin()),
        BudgetConfig::default(),
    );
    let summarizer = SummarizationEngine::new(llm.clone(), SummarizationConfig::default());
    ConversationOrchestrator::new(store, llm, summarizer, ConversationConfig::default())
}
