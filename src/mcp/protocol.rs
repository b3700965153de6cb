// ABOUTME: MCP protocol message handlers for core protocol operations
// ABOUTME: Handles initialize, ping, tools, and resources JSON-RPC messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # MCP Protocol Handlers
//!
//! Core MCP protocol message handling. The server is stateless per
//! request: each frame is dispatched independently against the shared
//! resources, and notifications produce no response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::jsonrpc_errors::{ERROR_INTERNAL, ERROR_INVALID_PARAMS, ERROR_METHOD_NOT_FOUND};
use crate::constants::protocol::{JSONRPC_VERSION, SCHEMA_RESOURCE_URI};
use crate::mcp::resources::{schema_text, ServerResources};
use crate::mcp::schema::{get_tools, InitializeResponse};
use crate::tools;

/// MCP request frame
#[derive(Debug, Clone, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: Option<String>,
    pub method: String,
    pub params: Option<Value>,
    /// Notifications carry no id; only regular requests do
    pub id: Option<Value>,
}

/// MCP response frame
#[derive(Debug, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub id: Value,
}

/// MCP error payload
#[derive(Debug, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
}

impl McpResponse {
    /// Create a successful MCP response
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error MCP response
    #[must_use]
    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: None,
            error: Some(McpError { code, message }),
            id,
        }
    }
}

/// Default ID for responses to frames that did not carry one
fn default_request_id() -> Value {
    Value::Number(serde_json::Number::from(0))
}

/// MCP protocol handlers
pub struct ProtocolHandler;

impl ProtocolHandler {
    /// Dispatch one protocol frame. Returns `None` for notifications.
    pub async fn handle_request(
        resources: &Arc<ServerResources>,
        request: McpRequest,
    ) -> Option<McpResponse> {
        debug!(method = %request.method, "Handling MCP request");

        if request.method.starts_with("notifications/") {
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(&request),
            "ping" => Self::handle_ping(&request),
            "tools/list" => Self::handle_tools_list(&request),
            "tools/call" => Self::handle_tools_call(resources, &request).await,
            "resources/list" => Self::handle_resources_list(&request),
            "resources/read" => Self::handle_resources_read(resources, &request).await,
            _ => Self::handle_unknown_method(&request),
        };

        Some(response)
    }

    /// Handle initialize request
    fn handle_initialize(request: &McpRequest) -> McpResponse {
        let request_id = request.id.clone().unwrap_or_else(default_request_id);
        match serde_json::to_value(InitializeResponse::new()) {
            Ok(result) => McpResponse::success(request_id, result),
            Err(_) => McpResponse::error(request_id, ERROR_INTERNAL, "Internal error".to_owned()),
        }
    }

    /// Handle ping request
    fn handle_ping(request: &McpRequest) -> McpResponse {
        let request_id = request.id.clone().unwrap_or_else(default_request_id);
        McpResponse::success(request_id, json!({}))
    }

    /// Handle tools list request
    fn handle_tools_list(request: &McpRequest) -> McpResponse {
        let request_id = request.id.clone().unwrap_or_else(default_request_id);
        McpResponse::success(request_id, json!({ "tools": get_tools() }))
    }

    /// Handle tools call request: validate the frame shape, then route the
    /// named tool and its argument bag through the dispatcher. Tool-level
    /// failures come back as `isError` results, not protocol errors.
    async fn handle_tools_call(
        resources: &Arc<ServerResources>,
        request: &McpRequest,
    ) -> McpResponse {
        let request_id = request.id.clone().unwrap_or_else(default_request_id);

        let Some(params) = &request.params else {
            return McpResponse::error(
                request_id,
                ERROR_INVALID_PARAMS,
                "Missing params for tools/call".to_owned(),
            );
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return McpResponse::error(
                request_id,
                ERROR_INVALID_PARAMS,
                "Missing tool name".to_owned(),
            );
        };
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let response = tools::dispatch(resources.database.as_ref(), name, &arguments).await;
        match serde_json::to_value(&response) {
            Ok(result) => McpResponse::success(request_id, result),
            Err(e) => {
                warn!(error = %e, "Failed to serialize tool response");
                McpResponse::error(request_id, ERROR_INTERNAL, "Internal error".to_owned())
            }
        }
    }

    /// Handle resources list request
    fn handle_resources_list(request: &McpRequest) -> McpResponse {
        let request_id = request.id.clone().unwrap_or_else(default_request_id);
        McpResponse::success(
            request_id,
            json!({
                "resources": [{
                    "uri": SCHEMA_RESOURCE_URI,
                    "name": "schema",
                    "description": "Complete database schema for all meal-prep tables (excludes conversations)",
                    "mimeType": "text/plain"
                }]
            }),
        )
    }

    /// Handle resources read request for the live schema resource
    async fn handle_resources_read(
        resources: &Arc<ServerResources>,
        request: &McpRequest,
    ) -> McpResponse {
        let request_id = request.id.clone().unwrap_or_else(default_request_id);

        let uri = request
            .params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str);
        if uri != Some(SCHEMA_RESOURCE_URI) {
            return McpResponse::error(
                request_id,
                ERROR_INVALID_PARAMS,
                format!("Unknown resource: {}", uri.unwrap_or("")),
            );
        }

        match schema_text(&resources.database).await {
            Ok(text) => McpResponse::success(
                request_id,
                json!({
                    "contents": [{
                        "uri": SCHEMA_RESOURCE_URI,
                        "mimeType": "text/plain",
                        "text": text
                    }]
                }),
            ),
            Err(e) => McpResponse::error(request_id, ERROR_INTERNAL, e.message),
        }
    }

    /// Handle an unknown method
    fn handle_unknown_method(request: &McpRequest) -> McpResponse {
        let request_id = request.id.clone().unwrap_or_else(default_request_id);
        McpResponse::error(
            request_id,
            ERROR_METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        )
    }
}
