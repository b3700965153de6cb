// ABOUTME: Export route producing a plain-text schema and data dump
// ABOUTME: DDL plus literal INSERT statements for backup and inspection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Database export route

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::errors::AppError;
use crate::mcp::resources::ServerResources;

/// Export routes
pub struct ExportRoutes;

impl ExportRoutes {
    /// Create all export routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/export/sql", get(Self::export_sql))
            .with_state(resources)
    }

    /// Produce the full textual dump. Not transactional with respect to
    /// concurrent writers.
    async fn export_sql(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let dump = resources.database.export_dump().await?;
        Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            dump,
        )
            .into_response())
    }
}
