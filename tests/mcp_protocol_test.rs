// ABOUTME: Integration tests for the MCP endpoint and protocol handlers
// ABOUTME: Covers bearer gating, catalogue negotiation, tool calls, and resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! MCP protocol tests over the real HTTP router.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::test_db;
use serde_json::{json, Value};
use std::sync::Arc;
use sous_mcp_server::config::{LlmConfig, ServerConfig};
use sous_mcp_server::errors::AppError;
use sous_mcp_server::llm::{CanonicalResponse, ChatMessage, LlmProvider, ToolDefinition};
use sous_mcp_server::mcp::resources::ServerResources;
use sous_mcp_server::routes;
use tower::ServiceExt;

/// Provider stub for surfaces that never reach the LLM
struct NoopProvider;

#[async_trait]
impl LlmProvider for NoopProvider {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn model(&self) -> &str {
        "noop-model"
    }

    async fn send(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<CanonicalResponse, AppError> {
        Err(AppError::external_service("noop", "not wired in this test"))
    }
}

async fn test_app(mcp_auth_token: Option<&str>) -> axum::Router {
    let database = test_db().await;
    let config = ServerConfig {
        http_port: 0,
        database_url: "sqlite::memory:".to_owned(),
        mcp_auth_token: mcp_auth_token.map(str::to_owned),
        llm: LlmConfig {
            model: "noop-model".to_owned(),
            anthropic_api_key: None,
            openai_api_key: Some("test".to_owned()),
        },
    };
    let resources = Arc::new(ServerResources::new(database, Arc::new(NoopProvider), config));
    routes::router(resources)
}

async fn post_mcp(app: axum::Router, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let response = app
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_initialize_and_ping() {
    let app = test_app(None).await;

    let (status, body) = post_mcp(
        app.clone(),
        None,
        json!({"jsonrpc": "2.0", "method": "initialize", "id": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["result"]["serverInfo"]["name"], "sous-mcp-server");

    let (_, body) = post_mcp(app, None, json!({"jsonrpc": "2.0", "method": "ping", "id": 2})).await;
    assert_eq!(body["result"], json!({}));
}

#[tokio::test]
async fn test_tools_list_exposes_constrained_catalogue_only() {
    let app = test_app(None).await;

    let (_, body) = post_mcp(
        app,
        None,
        json!({"jsonrpc": "2.0", "method": "tools/list", "id": 3}),
    )
    .await;

    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 8);
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"query"));
    assert!(names.contains(&"manage_recipes"));
    assert!(!names.contains(&"execute_sql"));
}

#[tokio::test]
async fn test_tools_call_routes_through_dispatch() {
    let app = test_app(None).await;

    let (_, body) = post_mcp(
        app.clone(),
        None,
        json!({
            "jsonrpc": "2.0", "method": "tools/call", "id": 4,
            "params": {"name": "manage_recipes",
                       "arguments": {"action": "create", "name": "Milanesas"}}
        }),
    )
    .await;

    assert_eq!(body["result"]["isError"], false);
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    let row: Value = serde_json::from_str(text).unwrap();
    assert_eq!(row["id"], "recipe_1");

    // Validation failures surface as isError tool results, not protocol errors
    let (_, body) = post_mcp(
        app,
        None,
        json!({
            "jsonrpc": "2.0", "method": "tools/call", "id": 5,
            "params": {"name": "manage_recipes", "arguments": {"action": "create"}}
        }),
    )
    .await;
    assert_eq!(body["result"]["isError"], true);
    assert!(body["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("name is required"));
}

#[tokio::test]
async fn test_schema_resource_excludes_conversations() {
    let app = test_app(None).await;

    let (_, body) = post_mcp(
        app.clone(),
        None,
        json!({"jsonrpc": "2.0", "method": "resources/list", "id": 6}),
    )
    .await;
    assert_eq!(body["result"]["resources"][0]["uri"], "sous://schema");

    let (_, body) = post_mcp(
        app,
        None,
        json!({
            "jsonrpc": "2.0", "method": "resources/read", "id": 7,
            "params": {"uri": "sous://schema"}
        }),
    )
    .await;
    let text = body["result"]["contents"][0]["text"].as_str().unwrap();
    assert!(text.contains("CREATE TABLE"));
    assert!(text.contains("recipes"));
    assert!(text.contains("batch_stock"));
    assert!(!text.contains("conversations"));
}

#[tokio::test]
async fn test_unknown_method_is_method_not_found() {
    let app = test_app(None).await;

    let (_, body) = post_mcp(
        app,
        None,
        json!({"jsonrpc": "2.0", "method": "prompts/explode", "id": 8}),
    )
    .await;
    assert_eq!(body["error"]["code"], -32601);
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let app = test_app(None).await;

    let (status, body) = post_mcp(
        app,
        None,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_batch_of_frames_returns_array() {
    let app = test_app(None).await;

    let (_, body) = post_mcp(
        app,
        None,
        json!([
            {"jsonrpc": "2.0", "method": "ping", "id": 1},
            {"jsonrpc": "2.0", "method": "notifications/initialized"},
            {"jsonrpc": "2.0", "method": "tools/list", "id": 2}
        ]),
    )
    .await;

    let responses = body.as_array().unwrap();
    assert_eq!(responses.len(), 2);
}

#[tokio::test]
async fn test_bearer_token_gates_the_endpoint() {
    let app = test_app(Some("sesame")).await;

    let (status, _) = post_mcp(
        app.clone(),
        None,
        json!({"jsonrpc": "2.0", "method": "ping", "id": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_mcp(
        app.clone(),
        Some("wrong"),
        json!({"jsonrpc": "2.0", "method": "ping", "id": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_mcp(
        app,
        Some("sesame"),
        json!({"jsonrpc": "2.0", "method": "ping", "id": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!({}));
}
