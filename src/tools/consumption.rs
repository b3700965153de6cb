// ABOUTME: Consumption record create/update/delete (leaf entity, no cascade)
// ABOUTME: Tracks servings eaten against inventory batches
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Consumption tracking.

use serde_json::Value;

use super::{action, db_error, echo_row, opt_i64, opt_str, require_i64, require_str, UpdateSet};
use crate::database::{next_id, Database};
use crate::mcp::schema::ToolResponse;
use crate::models::Consumption;

/// Handle a `manage_consumption` invocation
pub async fn run(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    match action(args)? {
        "create" => create(db, args).await,
        "update" => update(db, args).await,
        "delete" => delete(db, args).await,
        other => Err(format!("Unknown action: {other}")),
    }
}

async fn fetch(db: &Database, id: &str) -> Result<Consumption, String> {
    sqlx::query_as::<_, Consumption>("SELECT * FROM consumptions WHERE id = ?")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .map_err(|e| db_error(e.into()))
}

async fn create(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let batch_id = require_str(args, "batch_id", "create")?;
    let servings_consumed = require_i64(args, "servings_consumed", "create")?;
    let consumption_date = require_str(args, "consumption_date", "create")?;

    let new_id = next_id(db.pool(), "consumption", "consumptions")
        .await
        .map_err(db_error)?;

    sqlx::query(
        "INSERT INTO consumptions (id, batch_id, servings_consumed, consumption_date) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(&new_id)
    .bind(batch_id)
    .bind(servings_consumed)
    .bind(consumption_date)
    .execute(db.pool())
    .await
    .map_err(|e| db_error(e.into()))?;

    echo_row(&fetch(db, &new_id).await?)
}

async fn update(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "update")?;

    let mut set = UpdateSet::new();
    set.push_i64("servings_consumed", opt_i64(args, "servings_consumed")?);
    set.push_str("consumption_date", opt_str(args, "consumption_date")?);

    if set.is_empty() {
        return Err("No fields to update".to_owned());
    }
    if set.execute(db, "consumptions", id).await? == 0 {
        return Err(format!("Consumption {id} not found"));
    }

    echo_row(&fetch(db, id).await?)
}

async fn delete(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "delete")?;

    let changes = sqlx::query("DELETE FROM consumptions WHERE id = ?")
        .bind(id)
        .execute(db.pool())
        .await
        .map_err(|e| db_error(e.into()))?
        .rows_affected();

    if changes == 0 {
        return Err(format!("Consumption {id} not found"));
    }

    Ok(ToolResponse::text(format!("Deleted consumption {id}")))
}
