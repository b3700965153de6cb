// ABOUTME: Meal prep session and batch management with consumption cascade
// ABOUTME: Session deletion removes the session's batches and their consumption records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Session and batch management.
//!
//! A session represents a day of meal prep; batches track how many
//! servings of each recipe were produced. The optional `gantt` payload
//! stores the session's plain-text schedule DSL.

use serde_json::Value;

use super::{action, db_error, echo_row, opt_i64, opt_str, require_i64, require_str, UpdateSet};
use crate::database::{next_id, Database};
use crate::mcp::schema::ToolResponse;
use crate::models::{Batch, PrepSession};

/// Handle a `manage_sessions` invocation
pub async fn run(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    match action(args)? {
        "create_session" => create_session(db, args).await,
        "update_session" => update_session(db, args).await,
        "delete_session" => delete_session(db, args).await,
        "create_batch" => create_batch(db, args).await,
        "update_batch" => update_batch(db, args).await,
        "delete_batch" => delete_batch(db, args).await,
        other => Err(format!("Unknown action: {other}")),
    }
}

async fn create_session(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let date = require_str(args, "date", "create_session")?;
    let notes = opt_str(args, "notes")?;
    let gantt = opt_str(args, "gantt")?;

    let new_id = next_id(db.pool(), "session", "meal_prep_sessions")
        .await
        .map_err(db_error)?;

    sqlx::query("INSERT INTO meal_prep_sessions (id, date, notes, gantt) VALUES (?, ?, ?, ?)")
        .bind(&new_id)
        .bind(date)
        .bind(notes)
        .bind(gantt)
        .execute(db.pool())
        .await
        .map_err(|e| db_error(e.into()))?;

    let session =
        sqlx::query_as::<_, PrepSession>("SELECT * FROM meal_prep_sessions WHERE id = ?")
            .bind(&new_id)
            .fetch_one(db.pool())
            .await
            .map_err(|e| db_error(e.into()))?;
    echo_row(&session)
}

async fn update_session(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "update_session")?;

    let mut set = UpdateSet::new();
    set.push_str("date", opt_str(args, "date")?);
    set.push_str("notes", opt_str(args, "notes")?);
    set.push_str("gantt", opt_str(args, "gantt")?);

    if set.is_empty() {
        return Err("No fields to update".to_owned());
    }
    if set.execute(db, "meal_prep_sessions", id).await? == 0 {
        return Err(format!("Session {id} not found"));
    }

    let session =
        sqlx::query_as::<_, PrepSession>("SELECT * FROM meal_prep_sessions WHERE id = ?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .map_err(|e| db_error(e.into()))?;
    echo_row(&session)
}

async fn delete_session(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "delete_session")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    let batch_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM batches WHERE session_id = ?")
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    if !batch_ids.is_empty() {
        let placeholders = vec!["?"; batch_ids.len()].join(",");
        let sql = format!("DELETE FROM consumptions WHERE batch_id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for batch_id in &batch_ids {
            query = query.bind(batch_id);
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(e.into()))?;
    }

    sqlx::query("DELETE FROM batches WHERE session_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    let changes = sqlx::query("DELETE FROM meal_prep_sessions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?
        .rows_affected();

    if changes == 0 {
        return Err(format!("Session {id} not found"));
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!(
        "Deleted session {id} and all its batches"
    )))
}

async fn create_batch(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let session_id = require_str(args, "session_id", "create_batch")?;
    let recipe_id = require_str(args, "recipe_id", "create_batch")?;
    let servings_produced = require_i64(args, "servings_produced", "create_batch")?;
    let prep_date = require_str(args, "prep_date", "create_batch")?;

    let new_id = next_id(db.pool(), "batch", "batches")
        .await
        .map_err(db_error)?;

    sqlx::query(
        "INSERT INTO batches (id, recipe_id, session_id, servings_produced, prep_date) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&new_id)
    .bind(recipe_id)
    .bind(session_id)
    .bind(servings_produced)
    .bind(prep_date)
    .execute(db.pool())
    .await
    .map_err(|e| db_error(e.into()))?;

    let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = ?")
        .bind(&new_id)
        .fetch_one(db.pool())
        .await
        .map_err(|e| db_error(e.into()))?;
    echo_row(&batch)
}

async fn update_batch(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "update_batch")?;

    let mut set = UpdateSet::new();
    set.push_i64("servings_produced", opt_i64(args, "servings_produced")?);
    set.push_str("prep_date", opt_str(args, "prep_date")?);

    if set.is_empty() {
        return Err("No fields to update".to_owned());
    }
    if set.execute(db, "batches", id).await? == 0 {
        return Err(format!("Batch {id} not found"));
    }

    let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = ?")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .map_err(|e| db_error(e.into()))?;
    echo_row(&batch)
}

async fn delete_batch(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "delete_batch")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    sqlx::query("DELETE FROM consumptions WHERE batch_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    let changes = sqlx::query("DELETE FROM batches WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?
        .rows_affected();

    if changes == 0 {
        return Err(format!("Batch {id} not found"));
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!(
        "Deleted batch {id} and its consumption records"
    )))
}
