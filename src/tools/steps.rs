// ABOUTME: Step create/update/delete plus replace-semantics association setters
// ABOUTME: set_dependencies/set_ingredients/set_resources replace the full existing set
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Step management and step associations.
//!
//! The `set_*` actions implement replace-not-merge semantics: the entire
//! existing association set for the owning step is deleted and the
//! provided set inserted, inside one transaction.

use serde::Deserialize;
use serde_json::Value;

use super::{
    action, db_error, echo_row, opt_enum, opt_i64, opt_str, require_array, require_str, UpdateSet,
};
use crate::constants::domain::STEP_PHASES;
use crate::database::{next_id, Database};
use crate::mcp::schema::ToolResponse;
use crate::models::Step;

/// Ingredient usage entry for `set_ingredients`
#[derive(Debug, Deserialize)]
struct IngredientUsage {
    ingredient_id: String,
    quantity: Option<String>,
    unit: Option<String>,
}

/// Resource usage entry for `set_resources`
#[derive(Debug, Deserialize)]
struct ResourceUsage {
    resource_id: String,
    temperature_celsius: Option<i64>,
    notes: Option<String>,
}

/// Handle a `manage_steps` invocation
pub async fn run(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    match action(args)? {
        "create" => create(db, args).await,
        "update" => update(db, args).await,
        "delete" => delete(db, args).await,
        "set_dependencies" => set_dependencies(db, args).await,
        "set_ingredients" => set_ingredients(db, args).await,
        "set_resources" => set_resources(db, args).await,
        other => Err(format!("Unknown action: {other}")),
    }
}

async fn fetch(db: &Database, id: &str) -> Result<Step, String> {
    sqlx::query_as::<_, Step>("SELECT * FROM steps WHERE id = ?")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .map_err(|e| db_error(e.into()))
}

async fn create(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let recipe_id = require_str(args, "recipe_id", "create")?;
    let description = require_str(args, "description", "create")?;
    let phase = opt_enum(args, "phase", STEP_PHASES)?;
    let order_num = opt_i64(args, "order_num")?;
    let duration_minutes = opt_i64(args, "duration_minutes")?;

    let new_id = next_id(db.pool(), "step", "steps").await.map_err(db_error)?;

    sqlx::query(
        "INSERT INTO steps (id, recipe_id, description, phase, order_num, duration_minutes) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new_id)
    .bind(recipe_id)
    .bind(description)
    .bind(phase)
    .bind(order_num)
    .bind(duration_minutes)
    .execute(db.pool())
    .await
    .map_err(|e| db_error(e.into()))?;

    echo_row(&fetch(db, &new_id).await?)
}

async fn update(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "update")?;

    let mut set = UpdateSet::new();
    set.push_str("description", opt_str(args, "description")?);
    set.push_str("phase", opt_enum(args, "phase", STEP_PHASES)?);
    set.push_i64("order_num", opt_i64(args, "order_num")?);
    set.push_i64("duration_minutes", opt_i64(args, "duration_minutes")?);

    if set.is_empty() {
        return Err("No fields to update".to_owned());
    }
    if set.execute(db, "steps", id).await? == 0 {
        return Err(format!("Step {id} not found"));
    }

    echo_row(&fetch(db, id).await?)
}

async fn delete(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "delete")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    sqlx::query("DELETE FROM step_dependencies WHERE step_id = ? OR depends_on_step_id = ?")
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;
    sqlx::query("DELETE FROM step_ingredients WHERE step_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;
    sqlx::query("DELETE FROM step_resource_usage WHERE step_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    let changes = sqlx::query("DELETE FROM steps WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?
        .rows_affected();

    if changes == 0 {
        return Err(format!("Step {id} not found"));
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!(
        "Deleted step {id} and its associations"
    )))
}

async fn set_dependencies(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "set_dependencies")?;
    let deps: Vec<String> = require_array(args, "depends_on_step_ids", "set_dependencies")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    sqlx::query("DELETE FROM step_dependencies WHERE step_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    for dep_id in &deps {
        sqlx::query("INSERT INTO step_dependencies (step_id, depends_on_step_id) VALUES (?, ?)")
            .bind(id)
            .bind(dep_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(e.into()))?;
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!(
        "Set {} dependencies for step {id}",
        deps.len()
    )))
}

async fn set_ingredients(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "set_ingredients")?;
    let ingredients: Vec<IngredientUsage> = require_array(args, "ingredients", "set_ingredients")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    sqlx::query("DELETE FROM step_ingredients WHERE step_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    for usage in &ingredients {
        sqlx::query(
            "INSERT INTO step_ingredients (step_id, ingredient_id, quantity, unit) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&usage.ingredient_id)
        .bind(usage.quantity.as_deref())
        .bind(usage.unit.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!(
        "Set {} ingredients for step {id}",
        ingredients.len()
    )))
}

async fn set_resources(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "set_resources")?;
    let resources: Vec<ResourceUsage> = require_array(args, "resources", "set_resources")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    sqlx::query("DELETE FROM step_resource_usage WHERE step_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    for usage in &resources {
        sqlx::query(
            "INSERT INTO step_resource_usage (step_id, resource_id, temperature_celsius, notes) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&usage.resource_id)
        .bind(usage.temperature_celsius)
        .bind(usage.notes.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!(
        "Set {} resources for step {id}",
        resources.len()
    )))
}
