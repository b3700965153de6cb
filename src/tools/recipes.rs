// ABOUTME: Recipe create/update/delete with the full hand-specified cascade plan
// ABOUTME: Recipe deletion removes steps, associations, batches, consumptions, and plan refs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Recipe management.
//!
//! Deleting a recipe executes an ordered cascade over every table holding
//! a foreign key into it — step associations, steps, consumptions,
//! batches, meal plan references — inside one transaction, so concurrent
//! readers never observe a partially-cascaded state.

use serde_json::Value;

use super::{
    action, db_error, echo_row, opt_enum, opt_f64, opt_i64, opt_str, require_str, UpdateSet,
};
use crate::constants::domain::RECIPE_TYPES;
use crate::database::{next_id, Database};
use crate::mcp::schema::ToolResponse;
use crate::models::Recipe;

/// Handle a `manage_recipes` invocation
pub async fn run(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    match action(args)? {
        "create" => create(db, args).await,
        "update" => update(db, args).await,
        "delete" => delete(db, args).await,
        other => Err(format!("Unknown action: {other}")),
    }
}

async fn fetch(db: &Database, id: &str) -> Result<Recipe, String> {
    sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = ?")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .map_err(|e| db_error(e.into()))
}

async fn create(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let name = require_str(args, "name", "create")?;
    let recipe_type = opt_enum(args, "type", RECIPE_TYPES)?;
    let servings = opt_i64(args, "servings")?;
    let yield_amount = opt_f64(args, "yield_amount")?;
    let yield_unit = opt_str(args, "yield_unit")?;
    let frozen = opt_i64(args, "frozen_shelf_life_days")?;
    let fridge = opt_i64(args, "fridge_shelf_life_days")?;

    let new_id = next_id(db.pool(), "recipe", "recipes")
        .await
        .map_err(db_error)?;

    sqlx::query(
        "INSERT INTO recipes (id, name, type, servings, yield_amount, yield_unit, \
         frozen_shelf_life_days, fridge_shelf_life_days) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&new_id)
    .bind(name)
    .bind(recipe_type)
    .bind(servings)
    .bind(yield_amount)
    .bind(yield_unit)
    .bind(frozen)
    .bind(fridge)
    .execute(db.pool())
    .await
    .map_err(|e| db_error(e.into()))?;

    echo_row(&fetch(db, &new_id).await?)
}

async fn update(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "update")?;

    let mut set = UpdateSet::new();
    set.push_str("name", opt_str(args, "name")?);
    set.push_str("type", opt_enum(args, "type", RECIPE_TYPES)?);
    set.push_i64("servings", opt_i64(args, "servings")?);
    set.push_f64("yield_amount", opt_f64(args, "yield_amount")?);
    set.push_str("yield_unit", opt_str(args, "yield_unit")?);
    set.push_i64("frozen_shelf_life_days", opt_i64(args, "frozen_shelf_life_days")?);
    set.push_i64("fridge_shelf_life_days", opt_i64(args, "fridge_shelf_life_days")?);

    if set.is_empty() {
        return Err("No fields to update".to_owned());
    }
    if set.execute(db, "recipes", id).await? == 0 {
        return Err(format!("Recipe {id} not found"));
    }

    echo_row(&fetch(db, id).await?)
}

async fn delete(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "delete")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    let step_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM steps WHERE recipe_id = ?")
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    if !step_ids.is_empty() {
        let placeholders = vec!["?"; step_ids.len()].join(",");

        let sql = format!(
            "DELETE FROM step_dependencies \
             WHERE step_id IN ({placeholders}) OR depends_on_step_id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for step_id in &step_ids {
            query = query.bind(step_id);
        }
        for step_id in &step_ids {
            query = query.bind(step_id);
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(e.into()))?;

        for table in ["step_ingredients", "step_resource_usage"] {
            let sql = format!("DELETE FROM {table} WHERE step_id IN ({placeholders})");
            let mut query = sqlx::query(&sql);
            for step_id in &step_ids {
                query = query.bind(step_id);
            }
            query
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error(e.into()))?;
        }
    }

    sqlx::query("DELETE FROM steps WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    let batch_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM batches WHERE recipe_id = ?")
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

    sqlx::query("DELETE FROM batches WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    sqlx::query("DELETE FROM meal_plan_slot_recipes WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    let changes = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?
        .rows_affected();

    if changes == 0 {
        return Err(format!("Recipe {id} not found"));
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!(
        "Deleted recipe {id} and all associated data"
    )))
}
