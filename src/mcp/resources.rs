// ABOUTME: Shared server resource container and the live schema resource
// ABOUTME: Exposes table and view definitions so models can discover structure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Server resources shared across route handlers, plus the read-only
//! schema introspection resource.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::database::{ConversationStore, Database};
use crate::errors::AppResult;
use crate::llm::LlmProvider;

/// Shared resources handed to every route handler
pub struct ServerResources {
    /// Database manager
    pub database: Arc<Database>,
    /// Conversation record store
    pub conversations: ConversationStore,
    /// Configured upstream language-model provider
    pub provider: Arc<dyn LlmProvider>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Create new server resources with shared ownership
    #[must_use]
    pub fn new(database: Database, provider: Arc<dyn LlmProvider>, config: ServerConfig) -> Self {
        let conversations = ConversationStore::new(database.pool().clone());
        Self {
            database: Arc::new(database),
            conversations,
            provider,
            config: Arc::new(config),
        }
    }
}

/// Render the live schema: table and view definitions from
/// `sqlite_master`, excluding SQLite internals and the
/// conversation-persistence table.
///
/// # Errors
///
/// Returns a database error if the catalog query fails.
pub async fn schema_text(database: &Database) -> AppResult<String> {
    let definitions: Vec<String> = sqlx::query_scalar(
        "SELECT sql FROM sqlite_master \
         WHERE type IN ('table', 'view') AND sql IS NOT NULL \
           AND name NOT LIKE 'sqlite_%' AND name != 'conversations' \
         ORDER BY name",
    )
    .fetch_all(database.pool())
    .await?;

    Ok(format!("{};", definitions.join(";\n\n")))
}
