// ABOUTME: MCP transport route: bearer-gated JSON-RPC frame handling
// ABOUTME: Accepts single frames or batches; stateless per request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! MCP protocol endpoint.
//!
//! One endpoint accepts protocol frames for tool-catalogue negotiation
//! and tool invocation. When `MCP_AUTH_TOKEN` is configured, a bearer
//! check gates the endpoint before any tool logic runs.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;

use crate::constants::jsonrpc_errors::ERROR_INVALID_PARAMS;
use crate::errors::AppError;
use crate::mcp::protocol::{McpRequest, McpResponse, ProtocolHandler};
use crate::mcp::resources::ServerResources;

/// MCP routes
pub struct McpRoutes;

impl McpRoutes {
    /// Create all MCP routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/mcp", post(Self::handle))
            .with_state(resources)
    }

    /// Check the optional bearer token before any tool logic runs
    fn authorize(headers: &HeaderMap, resources: &ServerResources) -> Result<(), AppError> {
        let Some(expected) = &resources.config.mcp_auth_token else {
            return Ok(());
        };

        let header = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok());
        if header == Some(format!("Bearer {expected}").as_str()) {
            Ok(())
        } else {
            Err(AppError::auth_invalid("Unauthorized"))
        }
    }

    /// Handle one frame or a batch of frames
    async fn handle(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Response, AppError> {
        Self::authorize(&headers, &resources)?;

        match body {
            Value::Array(frames) => {
                let mut responses = Vec::with_capacity(frames.len());
                for frame in frames {
                    if let Some(response) = Self::handle_frame(&resources, frame).await {
                        responses.push(response);
                    }
                }
                if responses.is_empty() {
                    Ok(StatusCode::ACCEPTED.into_response())
                } else {
                    Ok((StatusCode::OK, Json(responses)).into_response())
                }
            }
            frame => match Self::handle_frame(&resources, frame).await {
                Some(response) => Ok((StatusCode::OK, Json(response)).into_response()),
                None => Ok(StatusCode::ACCEPTED.into_response()),
            },
        }
    }

    /// Parse and dispatch one frame; notifications produce no response
    async fn handle_frame(
        resources: &Arc<ServerResources>,
        frame: Value,
    ) -> Option<McpResponse> {
        match serde_json::from_value::<McpRequest>(frame) {
            Ok(request) => ProtocolHandler::handle_request(resources, request).await,
            Err(e) => Some(McpResponse::error(
                Value::Number(serde_json::Number::from(0)),
                ERROR_INVALID_PARAMS,
                format!("Invalid request frame: {e}"),
            )),
        }
    }
}
