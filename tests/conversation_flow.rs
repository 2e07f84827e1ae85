//! End-to-end conversation tests
//!
//! Drive the orchestrator and the agent service against an in-memory store
//! and a scripted completion client.

mod common;

use chat_context::agents::{AgentCatalog, AgentPipeline, AgentRole, AgentRun, AgentsService};
use chat_context::config::BudgetConfig;
use chat_context::context::ChatRole;
use chat_context::conversation::{SummarizationReport, SUMMARY_HEADER};
use chat_context::llm::LlmService;
use chat_context::registry::ModelRegistry;
use chat_context::storage::{ConversationStore, InMemoryStore};
use chat_context::ContextError;
use common::{is_summary_request, orchestrator, FakeCompletions};
use serde_json::json;
use std::sync::Arc;

const GPT35: &str = "openai/gpt-3.5-turbo";
const HAIKU: &str = "anthropic/claude-3-haiku";

#[tokio::test]
async fn test_summary_rolls_over_and_is_injected() {
    let client = FakeCompletions::chatty("Noted.");
    let store = Arc::new(InMemoryStore::new());
    let thread = store
        .create_thread("Trip".into(), Some("You are a travel planner.".into()))
        .await
        .unwrap();
    let orchestrator = orchestrator(client.clone(), store.clone());

    let first = orchestrator
        .process_user_message(thread.id, GPT35, "alice", json!("I want to visit Lisbon"))
        .await
        .unwrap();
    assert_eq!(
        first.summarization,
        SummarizationReport::NotTriggered {
            messages_since_summary: 2,
            threshold: 4
        }
    );

    let second = orchestrator
        .process_user_message(thread.id, GPT35, "alice", json!("I prefer trains"))
        .await
        .unwrap();
    assert_eq!(
        second.summarization,
        SummarizationReport::Updated { message_count: 4 }
    );
    assert_eq!(
        client.requests().iter().filter(|r| is_summary_request(r)).count(),
        1
    );

    let stored = store.get_summary(thread.id).await.unwrap().unwrap();
    assert_eq!(stored.message_count, 4);
    assert_eq!(
        stored.summary.core_facts,
        vec!["User is planning a trip to Lisbon".to_string()]
    );

    // only the message after the summary remains as history
    let third = orchestrator
        .process_user_message(thread.id, HAIKU, "alice", json!("Any hotel tips?"))
        .await
        .unwrap();
    assert_eq!(
        third.summarization,
        SummarizationReport::NotTriggered {
            messages_since_summary: 2,
            threshold: 4
        }
    );

    let last = client.chat_requests().pop().unwrap();
    assert_eq!(last.model, HAIKU);
    assert_eq!(last.system_prompt, "You are a travel planner.");
    assert_eq!(last.messages.len(), 2);
    assert_eq!(last.messages[0].role, ChatRole::Assistant);
    assert!(last.messages[0].content.starts_with(SUMMARY_HEADER));
    assert!(last.messages[0].content.contains("Prefers trains over flights"));
    // haiku gets the small slice
    assert!(!last.messages[0].content.contains("Decisions Made"));
    assert_eq!(last.messages[1].content, "Any hotel tips?");

    let messages = store.get_messages(thread.id, None).await.unwrap();
    assert_eq!(messages.len(), 6);
}

#[tokio::test]
async fn test_medium_models_see_decisions() {
    let client = FakeCompletions::chatty("Noted.");
    let store = Arc::new(InMemoryStore::new());
    let thread = store.create_thread("Trip".into(), None).await.unwrap();
    let orchestrator = orchestrator(client.clone(), store.clone());

    for text in ["one", "two", "three"] {
        orchestrator
            .process_user_message(thread.id, GPT35, "alice", json!(text))
            .await
            .unwrap();
    }

    let last = client.chat_requests().pop().unwrap();
    assert!(last.system_prompt.is_empty());
    assert!(last.messages[0].content.contains("Decisions Made"));
    assert!(last.messages[0].content.contains("Open Questions"));
}

#[tokio::test]
async fn test_rejected_messages_leave_thread_untouched() {
    let client = FakeCompletions::chatty("unused");
    let store = Arc::new(InMemoryStore::new());
    let thread = store.create_thread("t".into(), None).await.unwrap();
    let orchestrator = orchestrator(client.clone(), store.clone());

    let long = vec!["word"; 1200].join(" ");
    let err = orchestrator
        .process_user_message(thread.id, "mistralai/mistral-7b-instruct", "bob", json!(long))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ERROR_MSG_TOO_LONG");

    let err = orchestrator
        .process_user_message(thread.id, GPT35, "bob", json!({"text": "hi"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::InvalidMessageContent { .. }));

    let err = orchestrator
        .process_user_message(thread.id, "acme/unknown", "bob", json!("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::UnknownModel { .. }));

    assert!(store.get_messages(thread.id, None).await.unwrap().is_empty());
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_thread() {
    let client = FakeCompletions::chatty("unused");
    let store = Arc::new(InMemoryStore::new());
    let err = orchestrator(client, store)
        .process_user_message(uuid::Uuid::new_v4(), GPT35, "bob", json!("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::ThreadNotFound(_)));
}

fn agents_service(client: Arc<FakeCompletions>, store: Arc<InMemoryStore>) -> AgentsService {
    let llm = LlmService::new(
        client,
        Arc::new(ModelRegistry::builtin()),
        BudgetConfig::default(),
    );
    AgentsService::new(
        AgentPipeline::new(llm, Arc::new(AgentCatalog::builtin())),
        store,
    )
}

#[tokio::test]
async fn test_workflow_answer_is_saved_to_thread() {
    let client = FakeCompletions::new(|request| {
        let reply = if request.system_prompt.contains("master synthesizer") {
            "Final answer"
        } else if request.system_prompt.to_lowercase().contains("coordinator") {
            r#"["research trains", "compare prices"]"#
        } else {
            "partial"
        };
        Ok(reply.to_string())
    });
    let store = Arc::new(InMemoryStore::new());
    let thread = store.create_thread("Trip".into(), None).await.unwrap();

    let result = agents_service(client.clone(), store.clone())
        .process_thread_message(thread.id, "Plan my trip", None, true)
        .await
        .unwrap();

    assert_eq!(result.final_response, "Final answer");
    assert!(result.saved_to_thread);
    match &result.run {
        AgentRun::Workflow(state) => {
            assert_eq!(state.task_breakdown.len(), 2);
            assert_eq!(state.specialist_outputs.len(), 2);
        }
        other => panic!("expected workflow run, got {:?}", other),
    }
    // coordinator, two specialists, evaluator, synthesizer
    assert_eq!(client.requests().len(), 5);

    let messages = store.get_messages(thread.id, None).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Final answer");
    assert_eq!(
        messages[1].model_used.as_deref(),
        Some("agents:coordinator,specialist,evaluator,synthesizer")
    );
}

#[tokio::test]
async fn test_team_run_sees_thread_context() {
    let client = FakeCompletions::chatty("Researched.");
    let store = Arc::new(InMemoryStore::new());
    let thread = store
        .create_thread("Research".into(), Some("Be brief.".into()))
        .await
        .unwrap();

    let result = agents_service(client.clone(), store.clone())
        .process_thread_message(
            thread.id,
            "Find sources",
            Some(vec![AgentRole::Researcher, AgentRole::Evaluator]),
            false,
        )
        .await
        .unwrap();

    assert_eq!(result.final_response, "Researched.");
    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    let prompt = &requests[0].messages[0].content;
    assert!(prompt.starts_with("Context: "));
    assert!(prompt.contains("Be brief."));
    assert!(prompt.ends_with("User input: Find sources"));

    let messages = store.get_messages(thread.id, None).await.unwrap();
    assert_eq!(
        messages[1].model_used.as_deref(),
        Some("agents:researcher,evaluator")
    );
}

#[tokio::test]
async fn test_failed_agent_run_saves_nothing() {
    let client = FakeCompletions::new(|_| {
        Err(chat_context::llm::CompletionError::Timeout("60s".into()))
    });
    let store = Arc::new(InMemoryStore::new());
    let thread = store.create_thread("t".into(), None).await.unwrap();

    let err = agents_service(client, store.clone())
        .process_thread_message(thread.id, "hi", None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::Completion(_)));
    assert!(store.get_messages(thread.id, None).await.unwrap().is_empty());
}
