// ABOUTME: LLM provider abstraction layer with one canonical response shape
// ABOUTME: Defines the contract both upstream adapters (Anthropic, OpenAI) must satisfy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # LLM Provider Service Provider Interface
//!
//! This module defines the contract that upstream language-model adapters
//! must implement. Two incompatible wire formats exist upstream — the
//! Anthropic Messages API (typed content blocks, separate system field)
//! and the OpenAI chat completions API (inline message list, function-call
//! tool calls) — and both are normalized into a single
//! [`CanonicalResponse`] so the tool-calling loop is provider-agnostic.
//!
//! ## Key Concepts
//!
//! - **`ChatMessage`**: Role-based message, optionally carrying tool calls
//!   (assistant) or a tool-call back-reference (tool role)
//! - **`ToolCall`**: A model-issued request to invoke one named operation;
//!   immutable once received
//! - **`ToolDefinition`**: Provider-agnostic tool declaration
//! - **`CanonicalResponse`**: The single normalized reply shape

mod anthropic;
mod openai;
pub mod prompts;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::errors::{AppError, ErrorCode};

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
    /// Tool result message referencing a prior tool call
    Tool,
}

impl MessageRole {
    /// Convert to string representation for API calls
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A model-issued request to invoke one named operation.
///
/// The id is opaque and upstream-assigned; `arguments` is the serialized
/// structured payload exactly as the upstream produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque upstream-assigned call id
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Serialized JSON argument payload
    pub arguments: String,
}

/// A single message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Text content; may be absent on tool-calling assistant messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls issued by an assistant message, in upstream order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Back-reference to the tool call this message answers (tool role only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a plain assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message carrying tool calls
    #[must_use]
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool result message answering the given call id
    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Provider-agnostic tool declaration passed with each request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Human description shown to the model
    pub description: String,
    /// JSON-schema parameter shape
    pub parameters: serde_json::Value,
}

/// The single normalized shape both adapters produce.
///
/// Content blocks, function calls, stop conditions — whatever the upstream
/// returned — land here before the orchestrator inspects anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResponse {
    /// Assistant text, when present
    pub content: Option<String>,
    /// Tool calls in upstream order
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Upstream finish reason
    pub finish_reason: Option<String>,
}

impl CanonicalResponse {
    /// Check if this response requests any tool invocations
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Upstream language-model adapter.
///
/// Implementations convert the canonical conversation into their wire
/// format, perform one completion call, and convert the reply back. A
/// non-success upstream status becomes an `ExternalServiceError` carrying
/// the status and body; it is never retried here — a failed turn ends the
/// loop and is reported to the caller.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Unique provider identifier (e.g., "anthropic", "openai")
    fn name(&self) -> &'static str;

    /// Model identifier sent upstream
    fn model(&self) -> &str;

    /// Perform one chat completion with the given tool declarations
    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<CanonicalResponse, AppError>;
}

/// Build the configured provider, selected by model-name prefix.
///
/// `claude*` model names route to the Anthropic Messages API; everything
/// else routes to the OpenAI chat completions API.
///
/// # Errors
///
/// Returns `ConfigMissing` if the selected family has no API key.
pub fn provider_from_config(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, AppError> {
    if config.model.starts_with("claude") {
        let api_key = config.anthropic_api_key.clone().ok_or_else(|| {
            AppError::new(
                ErrorCode::ConfigMissing,
                format!("Model {} requires ANTHROPIC_API_KEY", config.model),
            )
        })?;
        Ok(Arc::new(AnthropicProvider::new(api_key, &config.model)))
    } else {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            AppError::new(
                ErrorCode::ConfigMissing,
                format!("Model {} requires OPENAI_API_KEY", config.model),
            )
        })?;
        Ok(Arc::new(OpenAiProvider::new(api_key, &config.model)))
    }
}
