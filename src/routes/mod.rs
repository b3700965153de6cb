// ABOUTME: HTTP route assembly for the REST and MCP surfaces
// ABOUTME: Merges chat, SQL, conversation, export, and MCP routers with shared middleware
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! HTTP routes

pub mod chat;
pub mod conversations;
pub mod export;
pub mod mcp;
pub mod sql;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::mcp::resources::ServerResources;

/// Assemble the full application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(chat::ChatRoutes::routes(resources.clone()))
        .merge(conversations::ConversationRoutes::routes(resources.clone()))
        .merge(sql::SqlRoutes::routes(resources.clone()))
        .merge(export::ExportRoutes::routes(resources.clone()))
        .merge(mcp::McpRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
