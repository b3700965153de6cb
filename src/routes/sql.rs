// ABOUTME: Unrestricted SQL route for the conversational UI exploration path
// ABOUTME: Accepts a semicolon-delimited batch and returns per-statement results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Ad hoc SQL batch route.
//!
//! Per-statement isolation, no overall transaction: partial success
//! across a batch is intentional on this path (the transactional
//! mutation engine is the constrained alternative).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::errors::AppError;
use crate::mcp::resources::ServerResources;
use crate::sql;

/// Request carrying the SQL batch
#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// SQL batch routes
pub struct SqlRoutes;

impl SqlRoutes {
    /// Create all SQL routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/sql", post(Self::execute))
            .with_state(resources)
    }

    /// Execute a batch; a single-statement batch unwraps to one result
    /// object, multiple statements return an array
    async fn execute(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<SqlRequest>,
    ) -> Result<Response, AppError> {
        let query = request
            .query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input("Query is required"))?;

        let results = sql::execute_batch(resources.database.as_ref(), &query).await;

        let body = if results.len() == 1 {
            serde_json::to_value(&results[0])?
        } else {
            serde_json::to_value(&results)?
        };

        Ok((StatusCode::OK, Json(body)).into_response())
    }
}
