// ABOUTME: SQL statement splitting, read-only classification, and batch execution
// ABOUTME: Serves the unrestricted exploration path and the read-only query gate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # SQL Batch Execution
//!
//! The unrestricted exploration path accepts a semicolon-delimited batch of
//! arbitrary SQL. Statements are split with quote tracking, classified as
//! select-vs-other, and executed independently: a failing statement is
//! captured in its own result slot and does not abort the rest of the
//! batch. There is deliberately no batch-level transaction.
//!
//! The read-only gate used by the constrained `query` tool also lives
//! here: it admits only statements whose leading keyword is SELECT, WITH,
//! or EXPLAIN, and executes exactly one statement.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::debug;

use crate::database::Database;
use crate::errors::AppResult;

/// Leading keywords admitted by the read-only gate
const READ_ONLY_KEYWORDS: &[&str] = &["SELECT", "WITH", "EXPLAIN"];

/// Result of executing one statement from a batch.
///
/// Exactly one of `rows`, (`changes`, `last_id`), or `error` is populated,
/// matching the statement's classification and outcome.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SqlResult {
    /// Result rows for select-classified statements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Value>>,
    /// Affected-row count for non-select statements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<u64>,
    /// Last generated rowid for non-select statements
    #[serde(rename = "lastID", skip_serializing_if = "Option::is_none")]
    pub last_id: Option<i64>,
    /// Error message when the statement failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Split a batch on semicolons while tracking single- and double-quote
/// nesting, so separators inside string literals are not treated as
/// statement boundaries. Empty fragments are dropped.
#[must_use]
pub fn split_statements(input: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in input.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(ch);
            }
            ';' if !in_single && !in_double => {
                if !current.trim().is_empty() {
                    statements.push(current.trim().to_owned());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_owned());
    }

    statements
}

/// Classify raw SQL text as read-only by its leading keyword
/// (whitespace-trimmed, case-insensitive).
#[must_use]
pub fn is_read_only(sql: &str) -> bool {
    let keyword: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase();
    READ_ONLY_KEYWORDS.contains(&keyword.as_str())
}

/// Classify a single statement as a row-returning select
fn is_select(sql: &str) -> bool {
    let keyword: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase();
    keyword == "SELECT"
}

/// Decode one column of a row into a JSON value
///
/// # Errors
///
/// Returns a database error if the column cannot be decoded.
pub fn column_value(row: &SqliteRow, index: usize) -> AppResult<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = raw.type_info().name().to_uppercase();
    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
        "REAL" => Value::from(row.try_get::<f64, _>(index)?),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            Value::String(format!("<BLOB: {} bytes>", bytes.len()))
        }
        _ => Value::String(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

/// Convert a row into a JSON object keyed by column name
///
/// # Errors
///
/// Returns a database error if any column cannot be decoded.
pub fn row_to_json(row: &SqliteRow) -> AppResult<Value> {
    let mut map = serde_json::Map::with_capacity(row.len());
    for column in row.columns() {
        map.insert(
            column.name().to_owned(),
            column_value(row, column.ordinal())?,
        );
    }
    Ok(Value::Object(map))
}

/// Execute a single read-only statement and return its rows.
///
/// Callers are expected to have passed the statement through
/// [`is_read_only`] first; this function performs the fetch only.
///
/// # Errors
///
/// Returns a database error if the statement fails.
pub async fn fetch_rows(db: &Database, sql: &str) -> AppResult<Vec<Value>> {
    let rows = sqlx::query(sql).fetch_all(db.pool()).await?;
    rows.iter().map(row_to_json).collect()
}

/// Execute a semicolon-delimited batch, one result per statement.
///
/// Select-classified statements return row sets; everything else returns
/// an affected-row count and the last generated rowid. Statement failures
/// are isolated: the error lands in that statement's slot and execution
/// continues with the next statement.
pub async fn execute_batch(db: &Database, input: &str) -> Vec<SqlResult> {
    let statements = split_statements(input);
    let mut results = Vec::with_capacity(statements.len());

    for statement in &statements {
        debug!(statement, "Executing batch statement");
        let result = if is_select(statement) {
            match fetch_rows(db, statement).await {
                Ok(rows) => SqlResult {
                    rows: Some(rows),
                    changes: Some(0),
                    ..SqlResult::default()
                },
                Err(e) => SqlResult {
                    error: Some(e.message),
                    ..SqlResult::default()
                },
            }
        } else {
            match sqlx::query(statement).execute(db.pool()).await {
                Ok(outcome) => SqlResult {
                    changes: Some(outcome.rows_affected()),
                    last_id: Some(outcome.last_insert_rowid()),
                    ..SqlResult::default()
                },
                Err(e) => SqlResult {
                    error: Some(e.to_string()),
                    ..SqlResult::default()
                },
            }
        };
        results.push(result);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_preserves_semicolon_inside_literal() {
        let statements = split_statements("SELECT 1; INSERT INTO t VALUES ('a;b')");
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "SELECT 1");
        assert_eq!(statements[1], "INSERT INTO t VALUES ('a;b')");
    }

    #[test]
    fn test_split_double_quotes_and_trailing_fragment() {
        let statements = split_statements(r#"UPDATE "a;b" SET x = 1; SELECT 2"#);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], r#"UPDATE "a;b" SET x = 1"#);
        assert_eq!(statements[1], "SELECT 2");
    }

    #[test]
    fn test_split_drops_empty_fragments() {
        let statements = split_statements("SELECT 1;;  ;SELECT 2;");
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_read_only_gate_accepts_select_family() {
        assert!(is_read_only("  select 1"));
        assert!(is_read_only("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(is_read_only("EXPLAIN QUERY PLAN SELECT 1"));
    }

    #[test]
    fn test_read_only_gate_rejects_mutations() {
        assert!(!is_read_only("DROP TABLE x"));
        assert!(!is_read_only("DELETE FROM x"));
        assert!(!is_read_only("  insert into x values (1)"));
        assert!(!is_read_only("SELECTX FROM x"));
    }
}
