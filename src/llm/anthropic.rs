// ABOUTME: Anthropic Messages API adapter using typed content blocks
// ABOUTME: Converts the canonical conversation to block format and normalizes replies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # Anthropic Provider
//!
//! Adapter for the Anthropic Messages API. The wire format differs from
//! the canonical shape in three ways, all handled here:
//!
//! - System text travels in a separate top-level `system` field of typed
//!   text blocks; the first block is marked cacheable, later system
//!   messages append additional blocks.
//! - Tool results are `tool_result` content blocks inside a user-role
//!   message referencing the originating call id.
//! - Tool invocations come back as `tool_use` content blocks whose input
//!   payload is re-serialized into the canonical `arguments` string.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::{CanonicalResponse, ChatMessage, LlmProvider, MessageRole, ToolCall, ToolDefinition};
use crate::errors::AppError;

/// Base URL for the Anthropic API
const API_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Fixed completion budget per request
const MAX_TOKENS: u32 = 4096;

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Messages API request structure
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<Vec<SystemBlock>>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

/// One block of system text
#[derive(Debug, Serialize)]
struct SystemBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

/// Prompt-cache marker for a system block
#[derive(Debug, Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Message with typed content blocks
#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

/// Typed content block (request and response directions)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

/// Tool declaration in Anthropic format
#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

/// Messages API response structure
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl AnthropicProvider {
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

    /// Convert the canonical conversation into the Messages API shape.
    ///
    /// System messages are lifted out into the `system` field (first block
    /// marked cacheable); tool-role messages become user-role `tool_result`
    /// blocks, merged into the preceding user message when roles repeat so
    /// the strict role alternation upstream expects is preserved.
    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> AnthropicRequest {
        let mut system: Vec<SystemBlock> = Vec::new();
        let mut converted: Vec<AnthropicMessage> = Vec::new();

        for message in messages {
            match message.role {
                MessageRole::System => {
                    let cache_control = if system.is_empty() {
                        Some(CacheControl { kind: "ephemeral" })
                    } else {
                        None
                    };
                    system.push(SystemBlock {
                        kind: "text",
                        text: message.content.clone().unwrap_or_default(),
                        cache_control,
                    });
                }
                MessageRole::User => {
                    push_blocks(
                        &mut converted,
                        "user",
                        vec![ContentBlock::Text {
                            text: message.content.clone().unwrap_or_default(),
                        }],
                    );
                }
                MessageRole::Assistant => {
                    let mut blocks = Vec::new();
                    if let Some(text) = &message.content {
                        if !text.is_empty() {
                            blocks.push(ContentBlock::Text { text: text.clone() });
                        }
                    }
                    for call in &message.tool_calls {
                        let input = serde_json::from_str(&call.arguments)
                            .unwrap_or_else(|_| Value::String(call.arguments.clone()));
                        blocks.push(ContentBlock::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input,
                        });
                    }
                    push_blocks(&mut converted, "assistant", blocks);
                }
                MessageRole::Tool => {
                    push_blocks(
                        &mut converted,
                        "user",
                        vec![ContentBlock::ToolResult {
                            tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                            content: message.content.clone().unwrap_or_default(),
                        }],
                    );
                }
            }
        }

        let tools = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|t| AnthropicTool {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        input_schema: t.parameters.clone(),
                    })
                    .collect(),
            )
        };

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: if system.is_empty() { None } else { Some(system) },
            messages: converted,
            tools,
        }
    }

    /// Normalize a Messages API response body into the canonical shape.
    ///
    /// The first `text` block becomes the assistant text; every `tool_use`
    /// block becomes a canonical tool call with its input payload
    /// serialized back to text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a valid Messages API response.
    pub fn parse_response(body: &str) -> Result<CanonicalResponse, AppError> {
        let response: AnthropicResponse = serde_json::from_str(body)
            .map_err(|e| AppError::internal(format!("Failed to parse Anthropic response: {e}")))?;

        let content = response.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
            _ => None,
        });

        let tool_calls = response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.to_string(),
                }),
                _ => None,
            })
            .collect();

        Ok(CanonicalResponse {
            content,
            tool_calls,
            finish_reason: response.stop_reason,
        })
    }
}

/// Append blocks under the given role, merging into the previous message
/// when it carries the same role
fn push_blocks(messages: &mut Vec<AnthropicMessage>, role: &'static str, blocks: Vec<ContentBlock>) {
    if blocks.is_empty() {
        return;
    }
    if let Some(last) = messages.last_mut() {
        if last.role == role {
            last.content.extend(blocks);
            return;
        }
    }
    messages.push(AnthropicMessage {
        role,
        content: blocks,
    });
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
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
        let url = format!("{}/v1/messages", self.base_url);

        debug!("Sending request to Anthropic API");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external_service("anthropic", format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::external_service("anthropic", format!("read failed: {e}")))?;

        if !status.is_success() {
            error!(status = %status, "Anthropic API error");
            return Err(AppError::external_service(
                "anthropic",
                format!("upstream status {status}: {body}"),
            ));
        }

        Self::parse_response(&body)
    }
}

impl Debug for AnthropicProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnthropicProvider")
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
