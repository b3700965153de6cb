// ABOUTME: Chat route handler and the multi-turn tool-calling loop
// ABOUTME: Owns per-turn conversation state and strictly sequential tool execution
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # Chat Orchestration
//!
//! One user turn drives a bounded state machine: call the provider,
//! execute any requested tools strictly in the order the upstream listed
//! them, append the results, and loop until the model answers with plain
//! text or the iteration cap is reached. Tool calls never run in
//! parallel; later calls may depend on side effects (such as a generated
//! id) of earlier ones in the same turn.
//!
//! The conversation is session-scoped state: the handler loads the
//! record, passes ownership of the history into the loop for the duration
//! of the turn, and persists it back afterwards. A provider failure
//! aborts the turn with no partial assistant message; the user message
//! stays durable.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::constants::tools as tool_names;
use crate::database::Database;
use crate::errors::AppError;
use crate::llm::{prompts, ChatMessage, LlmProvider, ToolDefinition};
use crate::mcp::resources::ServerResources;
use crate::tools;

/// Maximum number of tool call iterations before the loop is cut off
pub const MAX_TOOL_ITERATIONS: usize = 20;

/// Result of running one orchestrated turn
#[derive(Debug)]
pub struct TurnOutcome {
    /// Messages appended to the conversation during this turn
    pub messages: Vec<ChatMessage>,
    /// Number of provider round trips performed
    pub iterations: usize,
    /// Whether the iteration cap cut the turn off while the model was
    /// still producing tool calls
    pub limit_reached: bool,
}

/// Request to send a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Message content
    pub content: String,
}

/// Response for one orchestrated turn
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// Conversation id the turn was appended to
    pub conversation_id: String,
    /// Messages appended during the turn (assistant and tool messages)
    pub messages: Vec<ChatMessage>,
    /// Set when the iteration cap terminated the turn
    pub iteration_limit_reached: bool,
}

/// The tool list declared to the model on the chat path: exactly one
/// unrestricted batch-SQL tool. The constrained catalogue belongs to the
/// MCP surface.
#[must_use]
pub fn chat_tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: tool_names::EXECUTE_SQL.to_owned(),
        description: "Execute one or more SQL statements against the SQLite database. \
            Supports SELECT, INSERT, UPDATE, DELETE, and other SQL operations. Multiple \
            statements can be separated by semicolons."
            .to_owned(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SQL query or queries to execute. Multiple statements can be separated by semicolons."
                }
            },
            "required": ["query"]
        }),
    }]
}

/// Parse a tool call's serialized arguments; malformed payloads fall back
/// to treating the whole string as the query text
fn parse_arguments(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| json!({ "query": raw }))
}

/// Run the multi-turn tool execution loop over the given history.
///
/// New messages are appended to `history` as the turn progresses: the
/// assistant message (text plus tool calls), one tool-role result per
/// call in received order, and finally the plain assistant answer. If the
/// iteration cap is reached while the model is still producing tool
/// calls, no final assistant message is appended and the outcome reports
/// `limit_reached`.
///
/// # Errors
///
/// Returns the provider error unchanged if an upstream call fails; the
/// history then contains no partial assistant message for the failed
/// iteration.
pub async fn run_tool_loop(
    provider: &dyn LlmProvider,
    db: &Database,
    history: &mut Vec<ChatMessage>,
) -> Result<TurnOutcome, AppError> {
    let turn_start = history.len();

    let mut working: Vec<ChatMessage> = Vec::with_capacity(history.len() + 1);
    working.push(ChatMessage::system(prompts::system_prompt_with_clock(
        Local::now(),
    )));
    working.extend(history.iter().cloned());

    let tool_definitions = chat_tool_definitions();
    let mut iterations = 0;
    let mut limit_reached = true;

    for iteration in 0..MAX_TOOL_ITERATIONS {
        iterations = iteration + 1;

        let response = provider.send(&working, &tool_definitions).await?;

        if !response.has_tool_calls() {
            let message = ChatMessage::assistant(response.content.unwrap_or_default());
            history.push(message.clone());
            working.push(message);
            limit_reached = false;
            break;
        }

        info!(
            iteration,
            count = response.tool_calls.len(),
            "Executing tool calls"
        );

        let assistant =
            ChatMessage::assistant_with_tools(response.content, response.tool_calls.clone());
        history.push(assistant.clone());
        working.push(assistant);

        for call in &response.tool_calls {
            let args = parse_arguments(&call.arguments);
            let result = tools::dispatch(db, &call.name, &args).await;
            let message = ChatMessage::tool_result(&call.id, result.text_content());
            history.push(message.clone());
            working.push(message);
        }
    }

    Ok(TurnOutcome {
        messages: history[turn_start..].to_vec(),
        iterations,
        limit_reached,
    })
}

/// Derive a conversation title from the first user message
fn derive_title(content: &str) -> String {
    content.trim().chars().take(80).collect()
}

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/chat/conversations/:conversation_id/messages",
                post(Self::send_message),
            )
            .with_state(resources)
    }

    /// Handle one user turn: load the conversation record, run the tool
    /// loop, persist the updated history, and return the appended
    /// messages.
    async fn send_message(
        State(resources): State<Arc<ServerResources>>,
        Path(conversation_id): Path<String>,
        Json(request): Json<SendMessageRequest>,
    ) -> Result<Response, AppError> {
        if request.content.trim().is_empty() {
            return Err(AppError::invalid_input("content must not be empty"));
        }

        let record = resources.conversations.get(&conversation_id).await?;
        let mut history: Vec<ChatMessage> = match &record {
            Some(record) => serde_json::from_str(&record.history)?,
            None => Vec::new(),
        };
        let title = record
            .and_then(|r| r.title)
            .unwrap_or_else(|| derive_title(&request.content));

        history.push(ChatMessage::user(&request.content));

        // The user turn is durable before the upstream call so a provider
        // failure never drops it.
        resources
            .conversations
            .save(&conversation_id, &title, &serde_json::to_string(&history)?)
            .await?;

        let outcome = run_tool_loop(
            resources.provider.as_ref(),
            resources.database.as_ref(),
            &mut history,
        )
        .await?;

        resources
            .conversations
            .save(&conversation_id, &title, &serde_json::to_string(&history)?)
            .await?;

        let response = SendMessageResponse {
            conversation_id,
            messages: outcome.messages,
            iteration_limit_reached: outcome.limit_reached,
        };

        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
