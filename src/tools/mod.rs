// ABOUTME: Tool dispatch, argument-bag validation helpers, and shared plumbing
// ABOUTME: Routes named tool invocations to the mutation engine or the SQL paths
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # Tool Dispatch & Validation
//!
//! `dispatch` receives a named action plus a loosely-typed argument bag,
//! validates the required-field set for the action's discriminator, and
//! routes to the matching handler. Every failure — missing field, value
//! outside a declared enum, wrong type, missing target row, SQL error —
//! is returned as an `isError` tool result, never raised, so the
//! conversation loop can always feed the outcome back to the model.

pub mod consumption;
pub mod ingredients;
pub mod planning;
pub mod query;
pub mod recipes;
pub mod resources;
pub mod sessions;
pub mod steps;

use serde_json::Value;
use tracing::debug;

use crate::constants::tools as tool_names;
use crate::database::Database;
use crate::errors::AppError;
use crate::mcp::schema::ToolResponse;
use crate::sql;

/// Dispatch a named tool invocation against the store.
///
/// Unknown tool names produce the same returned-error shape as validation
/// failures.
pub async fn dispatch(db: &Database, name: &str, args: &Value) -> ToolResponse {
    debug!(tool = name, "Dispatching tool call");

    let outcome = match name {
        tool_names::QUERY => query::run(db, args).await,
        tool_names::EXECUTE_SQL => run_execute_sql(db, args).await,
        tool_names::MANAGE_RECIPES => recipes::run(db, args).await,
        tool_names::MANAGE_STEPS => steps::run(db, args).await,
        tool_names::MANAGE_INGREDIENTS => ingredients::run(db, args).await,
        tool_names::MANAGE_RESOURCES => resources::run(db, args).await,
        tool_names::MANAGE_SESSIONS => sessions::run(db, args).await,
        tool_names::MANAGE_CONSUMPTION => consumption::run(db, args).await,
        tool_names::MANAGE_MEAL_PLAN => planning::run(db, args).await,
        _ => Err(format!("Unknown tool: {name}")),
    };

    match outcome {
        Ok(response) => response,
        Err(text) => ToolResponse::error(text),
    }
}

/// Unrestricted batch execution for the conversational UI path.
///
/// The whole batch result is serialized back as the tool result; a batch
/// of one statement unwraps to a single object, mirroring the HTTP
/// endpoint's shape.
async fn run_execute_sql(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let batch = require_str(args, "query", "execute_sql")?;
    let results = sql::execute_batch(db, batch).await;

    let value = if results.len() == 1 {
        serde_json::to_value(&results[0])
    } else {
        serde_json::to_value(&results)
    };
    let text = value
        .and_then(|v| serde_json::to_string_pretty(&v))
        .map_err(|e| format!("Error: {e}"))?;

    Ok(ToolResponse::text(text))
}

// ============================================================================
// Argument-Bag Validation Helpers
// ============================================================================

/// Render a database failure as tool-result text
pub(crate) fn db_error(error: AppError) -> String {
    format!("Error: {}", error.message)
}

/// Read the `action` discriminator
pub(crate) fn action(args: &Value) -> Result<&str, String> {
    match args.get("action") {
        Some(Value::String(s)) => Ok(s),
        _ => Err("action is required".to_owned()),
    }
}

/// Require a non-empty string field for the given action
pub(crate) fn require_str<'a>(
    args: &'a Value,
    field: &str,
    action: &str,
) -> Result<&'a str, String> {
    match args.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        None | Some(Value::Null | Value::String(_)) => {
            Err(format!("{field} is required for {action}"))
        }
        Some(_) => Err(format!("{field} must be a string")),
    }
}

/// Require an integer field for the given action
pub(crate) fn require_i64(args: &Value, field: &str, action: &str) -> Result<i64, String> {
    match args.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| format!("{field} must be an integer")),
        None | Some(Value::Null) => Err(format!("{field} is required for {action}")),
        Some(_) => Err(format!("{field} must be an integer")),
    }
}

/// Optional string field; wrong type is a validation error
pub(crate) fn opt_str<'a>(args: &'a Value, field: &str) -> Result<Option<&'a str>, String> {
    match args.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(format!("{field} must be a string")),
    }
}

/// Optional integer field; wrong type is a validation error
pub(crate) fn opt_i64(args: &Value, field: &str) -> Result<Option<i64>, String> {
    match args.get(field) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{field} must be an integer")),
        Some(_) => Err(format!("{field} must be an integer")),
    }
}

/// Optional numeric field; wrong type is a validation error
pub(crate) fn opt_f64(args: &Value, field: &str) -> Result<Option<f64>, String> {
    match args.get(field) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("{field} must be a number")),
        Some(_) => Err(format!("{field} must be a number")),
    }
}

/// Optional enum-valued string field; values outside the declared set are
/// validation errors
pub(crate) fn opt_enum<'a>(
    args: &'a Value,
    field: &str,
    allowed: &[&str],
) -> Result<Option<&'a str>, String> {
    match opt_str(args, field)? {
        None => Ok(None),
        Some(value) if allowed.contains(&value) => Ok(Some(value)),
        Some(value) => Err(format!(
            "{field} must be one of: {} (got '{value}')",
            allowed.join(", ")
        )),
    }
}

/// Require an enum-valued string field for the given action
pub(crate) fn require_enum<'a>(
    args: &'a Value,
    field: &str,
    action: &str,
    allowed: &[&str],
) -> Result<&'a str, String> {
    opt_enum(args, field, allowed)?.ok_or_else(|| format!("{field} is required for {action}"))
}

/// Require an array field and deserialize its items
pub(crate) fn require_array<T: serde::de::DeserializeOwned>(
    args: &Value,
    field: &str,
    action: &str,
) -> Result<Vec<T>, String> {
    match args.get(field) {
        None | Some(Value::Null) => Err(format!("{field} is required for {action}")),
        Some(value @ Value::Array(_)) => {
            serde_json::from_value(value.clone()).map_err(|e| format!("{field} is malformed: {e}"))
        }
        Some(_) => Err(format!("{field} must be an array")),
    }
}

// ============================================================================
// Dynamic Update Support
// ============================================================================

/// A bound parameter for a dynamically assembled statement
#[derive(Debug, Clone)]
pub(crate) enum SqlParam {
    Text(String),
    Int(i64),
    Real(f64),
}

/// Accumulates `column = ?` assignments from only the fields explicitly
/// present in the call
#[derive(Debug, Default)]
pub(crate) struct UpdateSet {
    assignments: Vec<String>,
    params: Vec<SqlParam>,
}

impl UpdateSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_str(&mut self, column: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.assignments.push(format!("{column} = ?"));
            self.params.push(SqlParam::Text(value.to_owned()));
        }
    }

    pub(crate) fn push_i64(&mut self, column: &str, value: Option<i64>) {
        if let Some(value) = value {
            self.assignments.push(format!("{column} = ?"));
            self.params.push(SqlParam::Int(value));
        }
    }

    pub(crate) fn push_f64(&mut self, column: &str, value: Option<f64>) {
        if let Some(value) = value {
            self.assignments.push(format!("{column} = ?"));
            self.params.push(SqlParam::Real(value));
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Execute `UPDATE <table> SET ... WHERE id = ?`; returns rows affected
    pub(crate) async fn execute(self, db: &Database, table: &str, id: &str) -> Result<u64, String> {
        let sql = format!(
            "UPDATE \"{table}\" SET {} WHERE id = ?",
            self.assignments.join(", ")
        );
        let mut query = sqlx::query(&sql);
        for param in &self.params {
            query = match param {
                SqlParam::Text(s) => query.bind(s.as_str()),
                SqlParam::Int(i) => query.bind(*i),
                SqlParam::Real(f) => query.bind(*f),
            };
        }
        let result = query
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(|e| db_error(e.into()))?;
        Ok(result.rows_affected())
    }
}

/// Serialize a row struct as the tool-result echo of a mutated entity
pub(crate) fn echo_row<T: serde::Serialize>(row: &T) -> Result<ToolResponse, String> {
    serde_json::to_string(row)
        .map(ToolResponse::text)
        .map_err(|e| format!("Error: {e}"))
}
