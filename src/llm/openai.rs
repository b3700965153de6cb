// ABOUTME: OpenAI chat completions adapter passing the message list through inline
// ABOUTME: Renames function-call fields into the canonical response shape
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # OpenAI Provider
//!
//! Adapter for the OpenAI chat completions API. This wire format is close
//! to the canonical shape: the full message list travels inline (system
//! and tool roles included), tool results are ordinary `role: "tool"`
//! messages, and the reply already carries tool calls in a structure
//! isomorphic to [`CanonicalResponse`] — only field renaming is needed.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::{CanonicalResponse, ChatMessage, LlmProvider, ToolCall, ToolDefinition};
use crate::errors::AppError;

/// Base URL for the OpenAI API
const API_BASE_URL: &str = "https://api.openai.com";

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Chat completions request structure
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

/// Message structure (request direction)
#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool definition wrapper
#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAiFunction,
}

/// Function definition within a tool
#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

/// Tool call (both directions)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: OpenAiFunctionCall,
}

/// Function call details
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

/// Chat completions response structure
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

/// Choice in response
#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

/// Message in response
#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// OpenAI chat completions provider
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new provider with an API key and model identifier
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: API_BASE_URL.to_owned(),
            client: Client::new(),
        }
    }

    /// Override the API base URL (used by tests against a local endpoint)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Convert the canonical conversation into the chat completions shape
    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> OpenAiRequest {
        let messages = messages
            .iter()
            .map(|message| OpenAiMessage {
                role: message.role.as_str(),
                content: message.content.clone(),
                tool_calls: if message.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        message
                            .tool_calls
                            .iter()
                            .map(|call| OpenAiToolCall {
                                id: call.id.clone(),
                                kind: "function".to_owned(),
                                function: OpenAiFunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: message.tool_call_id.clone(),
            })
            .collect();

        let tools_out = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|t| OpenAiTool {
                        kind: "function",
                        function: OpenAiFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        OpenAiRequest {
            model: self.model.clone(),
            messages,
            tool_choice: tools_out.as_ref().map(|_| "auto"),
            tools: tools_out,
        }
    }

    /// Normalize a chat completions response body into the canonical shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a valid chat completions
    /// response or contains no choices.
    pub fn parse_response(body: &str) -> Result<CanonicalResponse, AppError> {
        let response: OpenAiResponse = serde_json::from_str(body)
            .map_err(|e| AppError::internal(format!("Failed to parse OpenAI response: {e}")))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("No choices in OpenAI response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(CanonicalResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, messages, tools), fields(model = %self.model))]
    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<CanonicalResponse, AppError> {
        let request = self.build_request(messages, tools);
        let url = format!("{}/v1/chat/completions", self.base_url);

        debug!("Sending request to OpenAI API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external_service("openai", format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::external_service("openai", format!("read failed: {e}")))?;

        if !status.is_success() {
            error!(status = %status, "OpenAI API error");
            return Err(AppError::external_service(
                "openai",
                format!("upstream status {status}: {body}"),
            ));
        }

        Self::parse_response(&body)
    }
}

impl Debug for OpenAiProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiProvider")
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
