// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into a strongly typed ServerConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Environment-based configuration management

use std::env;

use crate::errors::{AppError, ErrorCode};

/// Default HTTP port
const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default SQLite database URL
const DEFAULT_DATABASE_URL: &str = "sqlite:./data/sous.db";

/// Default model when an Anthropic key is configured
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Default model when only an OpenAI key is configured
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Language model provider configuration
///
/// Provider selection is driven by the model identifier: `claude*` model
/// names route to the Anthropic Messages API, everything else to the
/// OpenAI chat completions API.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model identifier sent upstream
    pub model: String,
    /// Anthropic API key, if configured
    pub anthropic_api_key: Option<String>,
    /// OpenAI API key, if configured
    pub openai_api_key: Option<String>,
}

impl LlmConfig {
    /// Load LLM configuration from environment variables.
    ///
    /// Reads `MODEL_NAME`, `ANTHROPIC_API_KEY`, and `OPENAI_API_KEY`. When
    /// `MODEL_NAME` is unset the model defaults to the family of whichever
    /// key is present, preferring Anthropic.
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` if neither API key is configured. A usable
    /// upstream credential is a startup requirement, not a per-request one.
    pub fn from_env() -> Result<Self, AppError> {
        let anthropic_api_key = env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty());
        let openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());

        if anthropic_api_key.is_none() && openai_api_key.is_none() {
            return Err(AppError::new(
                ErrorCode::ConfigMissing,
                "No LLM credential configured: set ANTHROPIC_API_KEY or OPENAI_API_KEY",
            ));
        }

        let model = env::var("MODEL_NAME").ok().filter(|m| !m.is_empty());
        let model = match model {
            Some(model) => model,
            None if anthropic_api_key.is_some() => DEFAULT_ANTHROPIC_MODEL.to_owned(),
            None => DEFAULT_OPENAI_MODEL.to_owned(),
        };

        Ok(Self {
            model,
            anthropic_api_key,
            openai_api_key,
        })
    }
}

/// Server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Database URL (SQLite path)
    pub database_url: String,
    /// Optional bearer token guarding the `/mcp` endpoint
    pub mcp_auth_token: Option<String>,
    /// Language model provider configuration
    pub llm: LlmConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `PORT`, `DATABASE_URL`, `MCP_AUTH_TOKEN`, and the LLM
    /// variables handled by [`LlmConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is not a valid port number or if no LLM
    /// credential is configured.
    pub fn from_env() -> Result<Self, AppError> {
        let http_port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::config(format!("Invalid PORT value: {raw}")))?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        let mcp_auth_token = env::var("MCP_AUTH_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            http_port,
            database_url,
            mcp_auth_token,
            llm: LlmConfig::from_env()?,
        })
    }

    /// One-line configuration summary for startup logging (no secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} database={} model={} mcp_auth={}",
            self.http_port,
            self.database_url,
            self.llm.model,
            if self.mcp_auth_token.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        )
    }
}
