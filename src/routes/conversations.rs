// ABOUTME: Conversation record routes: flat load/save/list/delete by opaque id
// ABOUTME: History is an opaque serialized payload owned by the chat orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Conversation persistence routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::mcp::resources::ServerResources;

/// Request to save a conversation record
#[derive(Debug, Deserialize)]
pub struct SaveConversationRequest {
    /// Record id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Conversation title
    #[serde(default)]
    pub title: Option<String>,
    /// Full message history
    pub history: Value,
}

/// Conversation record response with parsed history
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: String,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub history: Value,
}

/// Conversation record routes
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Create all conversation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/conversations", get(Self::list))
            .route("/api/conversations", post(Self::save))
            .route("/api/conversations/:id", get(Self::get_one))
            .route("/api/conversations/:id", delete(Self::delete_one))
            .with_state(resources)
    }

    /// List conversation summaries, most recently updated first
    async fn list(State(resources): State<Arc<ServerResources>>) -> Result<Response, AppError> {
        let summaries = resources.conversations.list().await?;
        Ok((StatusCode::OK, Json(summaries)).into_response())
    }

    /// Insert or replace a conversation record
    async fn save(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<SaveConversationRequest>,
    ) -> Result<Response, AppError> {
        let id = request.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let title = request.title.unwrap_or_default();
        let history = serde_json::to_string(&request.history)?;

        resources.conversations.save(&id, &title, &history).await?;

        Ok((StatusCode::OK, Json(serde_json::json!({ "id": id }))).into_response())
    }

    /// Load a conversation record with its parsed history
    async fn get_one(
        State(resources): State<Arc<ServerResources>>,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let record = resources
            .conversations
            .get(&id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;

        let response = ConversationResponse {
            id: record.id,
            title: record.title,
            created_at: record.created_at,
            updated_at: record.updated_at,
            history: serde_json::from_str(&record.history)?,
        };

        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Delete a conversation record
    async fn delete_one(
        State(resources): State<Arc<ServerResources>>,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let deleted = resources.conversations.delete(&id).await?;
        Ok((StatusCode::OK, Json(serde_json::json!({ "deleted": deleted }))).into_response())
    }
}
