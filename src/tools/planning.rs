// ABOUTME: Weekly meal plan management: weeks, slots, and slot recipe assignment
// ABOUTME: set_meal_slot finds or creates the slot and replaces its recipe set atomically
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Weekly meal plan management.
//!
//! `set_meal_slot` locates the slot for (week, day, meal type), creating
//! it when absent, then replaces the slot's full recipe assignment set —
//! all inside one transaction.

use serde_json::Value;

use super::{action, db_error, echo_row, opt_str, require_array, require_enum, require_str, UpdateSet};
use crate::constants::domain::{DAYS_OF_WEEK, MEAL_TYPES};
use crate::database::{next_id, Database};
use crate::mcp::schema::ToolResponse;
use crate::models::Week;

/// Handle a `manage_meal_plan` invocation
pub async fn run(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    match action(args)? {
        "create_week" => create_week(db, args).await,
        "update_week" => update_week(db, args).await,
        "delete_week" => delete_week(db, args).await,
        "set_meal_slot" => set_meal_slot(db, args).await,
        "delete_meal_slot" => delete_meal_slot(db, args).await,
        other => Err(format!("Unknown action: {other}")),
    }
}

async fn fetch_week(db: &Database, id: &str) -> Result<Week, String> {
    sqlx::query_as::<_, Week>("SELECT * FROM weeks WHERE id = ?")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .map_err(|e| db_error(e.into()))
}

async fn create_week(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let start_date = require_str(args, "start_date", "create_week")?;
    let notes = opt_str(args, "notes")?;

    let new_id = next_id(db.pool(), "week", "weeks").await.map_err(db_error)?;

    sqlx::query("INSERT INTO weeks (id, start_date, notes) VALUES (?, ?, ?)")
        .bind(&new_id)
        .bind(start_date)
        .bind(notes)
        .execute(db.pool())
        .await
        .map_err(|e| db_error(e.into()))?;

    echo_row(&fetch_week(db, &new_id).await?)
}

async fn update_week(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "update_week")?;

    let mut set = UpdateSet::new();
    set.push_str("start_date", opt_str(args, "start_date")?);
    set.push_str("notes", opt_str(args, "notes")?);

    if set.is_empty() {
        return Err("No fields to update".to_owned());
    }
    if set.execute(db, "weeks", id).await? == 0 {
        return Err(format!("Week {id} not found"));
    }

    echo_row(&fetch_week(db, id).await?)
}

async fn delete_week(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "delete_week")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    let slot_ids: Vec<String> =
        sqlx::query_scalar("SELECT id FROM meal_plan_slots WHERE week_id = ?")
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| db_error(e.into()))?;

    if !slot_ids.is_empty() {
        let placeholders = vec!["?"; slot_ids.len()].join(",");
        let sql = format!("DELETE FROM meal_plan_slot_recipes WHERE slot_id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for slot_id in &slot_ids {
            query = query.bind(slot_id);
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(e.into()))?;
    }

    sqlx::query("DELETE FROM meal_plan_slots WHERE week_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    let changes = sqlx::query("DELETE FROM weeks WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?
        .rows_affected();

    if changes == 0 {
        return Err(format!("Week {id} not found"));
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!(
        "Deleted week {id} and all its meal slots"
    )))
}

async fn set_meal_slot(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let week_id = require_str(args, "week_id", "set_meal_slot")?;
    let day_of_week = require_enum(args, "day_of_week", "set_meal_slot", DAYS_OF_WEEK)?;
    let meal_type = require_enum(args, "meal_type", "set_meal_slot", MEAL_TYPES)?;
    let recipe_ids: Vec<String> = require_array(args, "recipe_ids", "set_meal_slot")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    let existing: Option<String> = sqlx::query_scalar(
        "SELECT id FROM meal_plan_slots WHERE week_id = ? AND day_of_week = ? AND meal_type = ?",
    )
    .bind(week_id)
    .bind(day_of_week)
    .bind(meal_type)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| db_error(e.into()))?;

    let slot_id = match existing {
        Some(slot_id) => {
            sqlx::query("DELETE FROM meal_plan_slot_recipes WHERE slot_id = ?")
                .bind(&slot_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error(e.into()))?;
            slot_id
        }
        None => {
            let slot_id = next_id(&mut *tx, "slot", "meal_plan_slots")
                .await
                .map_err(db_error)?;
            sqlx::query(
                "INSERT INTO meal_plan_slots (id, week_id, day_of_week, meal_type) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&slot_id)
            .bind(week_id)
            .bind(day_of_week)
            .bind(meal_type)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(e.into()))?;
            slot_id
        }
    };

    for recipe_id in &recipe_ids {
        sqlx::query("INSERT INTO meal_plan_slot_recipes (slot_id, recipe_id) VALUES (?, ?)")
            .bind(&slot_id)
            .bind(recipe_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(e.into()))?;
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!(
        "Set {} recipes for {day_of_week} {meal_type} (slot {slot_id})",
        recipe_ids.len()
    )))
}

async fn delete_meal_slot(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "delete_meal_slot")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    sqlx::query("DELETE FROM meal_plan_slot_recipes WHERE slot_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    let changes = sqlx::query("DELETE FROM meal_plan_slots WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?
        .rows_affected();

    if changes == 0 {
        return Err(format!("Meal slot {id} not found"));
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!("Deleted meal slot {id}")))
}
