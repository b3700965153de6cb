// ABOUTME: Shared helpers for integration tests
// ABOUTME: Provides an in-memory migrated database and tool-call shorthand
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

#![allow(dead_code)]

use serde_json::Value;
use sous_mcp_server::database::Database;
use sous_mcp_server::mcp::schema::ToolResponse;
use sous_mcp_server::tools;

/// Open a fresh in-memory database with migrations applied
pub async fn test_db() -> Database {
    Database::new("sqlite::memory:")
        .await
        .expect("in-memory database")
}

/// Dispatch a tool call and return the response
pub async fn call(db: &Database, tool: &str, args: Value) -> ToolResponse {
    tools::dispatch(db, tool, &args).await
}

/// Dispatch a tool call expected to succeed, returning its text
pub async fn call_ok(db: &Database, tool: &str, args: Value) -> String {
    let response = call(db, tool, args).await;
    assert!(
        !response.is_error,
        "expected success, got error: {}",
        response.text_content()
    );
    response.text_content()
}

/// Dispatch a tool call expected to fail, returning the error text
pub async fn call_err(db: &Database, tool: &str, args: Value) -> String {
    let response = call(db, tool, args).await;
    assert!(
        response.is_error,
        "expected error, got success: {}",
        response.text_content()
    );
    response.text_content()
}

/// Count rows in a table
pub async fn count(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("count query")
}

/// Parse the id out of an entity echo
pub fn echoed_id(text: &str) -> String {
    let value: Value = serde_json::from_str(text).expect("entity echo is JSON");
    value["id"].as_str().expect("id field").to_owned()
}
