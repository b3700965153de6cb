// ABOUTME: Ingredient create/update/delete with step-usage reference cleanup
// ABOUTME: Deleting an ingredient removes its step_ingredients references first
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Ingredient management.

use serde_json::Value;

use super::{action, db_error, echo_row, opt_enum, opt_str, require_str, UpdateSet};
use crate::constants::domain::INGREDIENT_TYPES;
use crate::database::{next_id, Database};
use crate::mcp::schema::ToolResponse;
use crate::models::Ingredient;

/// Handle a `manage_ingredients` invocation
pub async fn run(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    match action(args)? {
        "create" => create(db, args).await,
        "update" => update(db, args).await,
        "delete" => delete(db, args).await,
        other => Err(format!("Unknown action: {other}")),
    }
}

async fn fetch(db: &Database, id: &str) -> Result<Ingredient, String> {
    sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE id = ?")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .map_err(|e| db_error(e.into()))
}

async fn create(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let name = require_str(args, "name", "create")?;
    let ingredient_type = opt_enum(args, "type", INGREDIENT_TYPES)?;

    let new_id = next_id(db.pool(), "ingredient", "ingredients")
        .await
        .map_err(db_error)?;

    sqlx::query("INSERT INTO ingredients (id, name, type) VALUES (?, ?, ?)")
        .bind(&new_id)
        .bind(name)
        .bind(ingredient_type)
        .execute(db.pool())
        .await
        .map_err(|e| db_error(e.into()))?;

    echo_row(&fetch(db, &new_id).await?)
}

async fn update(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "update")?;

    let mut set = UpdateSet::new();
    set.push_str("name", opt_str(args, "name")?);
    set.push_str("type", opt_enum(args, "type", INGREDIENT_TYPES)?);

    if set.is_empty() {
        return Err("No fields to update".to_owned());
    }
    if set.execute(db, "ingredients", id).await? == 0 {
        return Err(format!("Ingredient {id} not found"));
    }

    echo_row(&fetch(db, id).await?)
}

async fn delete(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "delete")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    sqlx::query("DELETE FROM step_ingredients WHERE ingredient_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    let changes = sqlx::query("DELETE FROM ingredients WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?
        .rows_affected();

    if changes == 0 {
        return Err(format!("Ingredient {id} not found"));
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!("Deleted ingredient {id}")))
}
