// ABOUTME: Integration tests for the tool-calling loop state machine
// ABOUTME: Uses scripted providers to exercise ordering, cap, and error paths
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Orchestrator tests: sequential tool execution in received order, the
//! iteration cap, history consistency, and provider-failure behavior.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use async_trait::async_trait;
use common::test_db;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use sous_mcp_server::errors::AppError;
use sous_mcp_server::llm::{
    CanonicalResponse, ChatMessage, LlmProvider, MessageRole, ToolCall, ToolDefinition,
};
use sous_mcp_server::routes::chat::{run_tool_loop, MAX_TOOL_ITERATIONS};

/// Provider that replays a fixed script of canonical responses
struct ScriptedProvider {
    script: Mutex<Vec<CanonicalResponse>>,
    calls: AtomicUsize,
    seen_messages: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    fn new(script: Vec<CanonicalResponse>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            seen_messages: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<CanonicalResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_messages.lock().unwrap().push(messages.to_vec());
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            Err(AppError::external_service("scripted", "script exhausted"))
        } else {
            Ok(script.remove(0))
        }
    }
}

/// Provider that always asks for one more tool call
struct EndlessToolProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for EndlessToolProvider {
    fn name(&self) -> &'static str {
        "endless"
    }

    fn model(&self) -> &str {
        "endless-model"
    }

    async fn send(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<CanonicalResponse, AppError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CanonicalResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: format!("call_{n}"),
                name: "execute_sql".to_owned(),
                arguments: r#"{"query":"SELECT 1"}"#.to_owned(),
            }],
            finish_reason: Some("tool_use".to_owned()),
        })
    }
}

fn tool_call(id: &str, query: &str) -> ToolCall {
    ToolCall {
        id: id.to_owned(),
        name: "execute_sql".to_owned(),
        arguments: format!(r#"{{"query":"{query}"}}"#),
    }
}

#[tokio::test]
async fn test_plain_answer_terminates_after_one_iteration() {
    let db = test_db().await;
    let provider = ScriptedProvider::new(vec![CanonicalResponse {
        content: Some("Hola!".to_owned()),
        tool_calls: vec![],
        finish_reason: Some("stop".to_owned()),
    }]);

    let mut history = vec![ChatMessage::user("Hola")];
    let outcome = run_tool_loop(&provider, &db, &mut history).await.unwrap();

    assert_eq!(provider.call_count(), 1);
    assert_eq!(outcome.iterations, 1);
    assert!(!outcome.limit_reached);
    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(outcome.messages[0].role, MessageRole::Assistant);
    assert_eq!(outcome.messages[0].content.as_deref(), Some("Hola!"));
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_tool_calls_execute_sequentially_in_received_order() {
    let db = test_db().await;

    // One assistant turn with two calls: the second depends on the table
    // the first creates, so order matters.
    let provider = ScriptedProvider::new(vec![
        CanonicalResponse {
            content: Some("Creating and inserting.".to_owned()),
            tool_calls: vec![
                tool_call("a", "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)"),
                tool_call("b", "INSERT INTO notes (body) VALUES ('hi')"),
            ],
            finish_reason: Some("tool_use".to_owned()),
        },
        CanonicalResponse {
            content: Some("Listo.".to_owned()),
            tool_calls: vec![],
            finish_reason: Some("stop".to_owned()),
        },
    ]);

    let mut history = vec![ChatMessage::user("make a notes table")];
    let outcome = run_tool_loop(&provider, &db, &mut history).await.unwrap();

    assert_eq!(outcome.iterations, 2);
    assert!(!outcome.limit_reached);

    // assistant(with calls), tool(a), tool(b), assistant(final)
    assert_eq!(outcome.messages.len(), 4);
    assert_eq!(outcome.messages[0].role, MessageRole::Assistant);
    assert_eq!(outcome.messages[0].tool_calls.len(), 2);
    assert_eq!(outcome.messages[1].role, MessageRole::Tool);
    assert_eq!(outcome.messages[1].tool_call_id.as_deref(), Some("a"));
    assert_eq!(outcome.messages[2].tool_call_id.as_deref(), Some("b"));
    assert_eq!(outcome.messages[3].role, MessageRole::Assistant);

    // The second statement saw the first one's side effect
    assert!(!outcome.messages[2].content.as_deref().unwrap().contains("error"));
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_tool_errors_are_fed_back_not_raised() {
    let db = test_db().await;
    let provider = ScriptedProvider::new(vec![
        CanonicalResponse {
            content: None,
            tool_calls: vec![tool_call("bad", "SELECT * FROM missing_table")],
            finish_reason: Some("tool_use".to_owned()),
        },
        CanonicalResponse {
            content: Some("That table does not exist.".to_owned()),
            tool_calls: vec![],
            finish_reason: Some("stop".to_owned()),
        },
    ]);

    let mut history = vec![ChatMessage::user("query it")];
    let outcome = run_tool_loop(&provider, &db, &mut history).await.unwrap();

    assert!(!outcome.limit_reached);
    let tool_msg = &outcome.messages[1];
    assert_eq!(tool_msg.role, MessageRole::Tool);
    assert!(tool_msg.content.as_deref().unwrap().contains("error"));
}

#[tokio::test]
async fn test_iteration_cap_terminates_without_final_assistant_text() {
    let db = test_db().await;
    let provider = EndlessToolProvider {
        calls: AtomicUsize::new(0),
    };

    let mut history = vec![ChatMessage::user("loop forever")];
    let outcome = run_tool_loop(&provider, &db, &mut history).await.unwrap();

    assert_eq!(outcome.iterations, MAX_TOOL_ITERATIONS);
    assert_eq!(provider.calls.load(Ordering::SeqCst), MAX_TOOL_ITERATIONS);
    assert!(outcome.limit_reached);

    // 20 iterations, each one assistant + one tool message; no trailing
    // plain assistant answer.
    assert_eq!(outcome.messages.len(), MAX_TOOL_ITERATIONS * 2);
    assert_ne!(
        outcome.messages.last().unwrap().role,
        MessageRole::Assistant
    );

    // Every tool message references a call id issued by a preceding
    // assistant message.
    let mut issued: Vec<String> = Vec::new();
    for message in &history {
        match message.role {
            MessageRole::Assistant => {
                issued.extend(message.tool_calls.iter().map(|c| c.id.clone()));
            }
            MessageRole::Tool => {
                let id = message.tool_call_id.as_deref().unwrap();
                assert!(issued.iter().any(|issued_id| issued_id == id));
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_provider_failure_aborts_turn_without_partial_message() {
    let db = test_db().await;
    let provider = ScriptedProvider::new(vec![]);

    let mut history = vec![ChatMessage::user("hola")];
    let before = history.len();
    let result = run_tool_loop(&provider, &db, &mut history).await;

    assert!(result.is_err());
    assert_eq!(history.len(), before);
}

#[tokio::test]
async fn test_system_message_carries_clock_and_precedes_history() {
    let db = test_db().await;
    let provider = ScriptedProvider::new(vec![CanonicalResponse {
        content: Some("ok".to_owned()),
        tool_calls: vec![],
        finish_reason: None,
    }]);

    let mut history = vec![
        ChatMessage::user("first"),
        ChatMessage::assistant("earlier answer"),
        ChatMessage::user("second"),
    ];
    run_tool_loop(&provider, &db, &mut history).await.unwrap();

    let seen = provider.seen_messages.lock().unwrap();
    let first_call = &seen[0];
    assert_eq!(first_call[0].role, MessageRole::System);
    assert!(first_call[0].content.as_deref().unwrap().contains("CURRENT:"));
    assert_eq!(first_call.len(), 4);
    assert_eq!(first_call[1].content.as_deref(), Some("first"));
}
