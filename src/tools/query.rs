// ABOUTME: Read-only query tool gated by leading-keyword classification
// ABOUTME: Executes exactly one statement and returns rows only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! The constrained read path: one statement, select-family only.

use serde_json::Value;

use super::require_str;
use crate::database::Database;
use crate::mcp::schema::ToolResponse;
use crate::sql;

/// Execute a read-only query, rejecting anything whose leading keyword is
/// not SELECT, WITH, or EXPLAIN before it reaches the store.
pub async fn run(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let statement = require_str(args, "sql", "query")?;

    if !sql::is_read_only(statement) {
        return Ok(ToolResponse::error(
            "Only read-only queries are allowed (SELECT, WITH, EXPLAIN).",
        ));
    }

    match sql::fetch_rows(db, statement).await {
        Ok(rows) => {
            let text = serde_json::to_string_pretty(&rows).map_err(|e| format!("Error: {e}"))?;
            Ok(ToolResponse::text(text))
        }
        Err(e) => Ok(ToolResponse::error(format!("SQL error: {}", e.message))),
    }
}
