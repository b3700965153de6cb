// ABOUTME: Kitchen resource create/update/delete with usage reference cleanup
// ABOUTME: Deleting a resource removes its step_resource_usage references first
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Kitchen resource management (oven, pan, pot, stove).

use serde_json::Value;

use super::{action, db_error, echo_row, opt_enum, opt_str, require_str, UpdateSet};
use crate::constants::domain::RESOURCE_TYPES;
use crate::database::{next_id, Database};
use crate::mcp::schema::ToolResponse;
use crate::models::KitchenResource;

/// Handle a `manage_resources` invocation
pub async fn run(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    match action(args)? {
        "create" => create(db, args).await,
        "update" => update(db, args).await,
        "delete" => delete(db, args).await,
        other => Err(format!("Unknown action: {other}")),
    }
}

async fn fetch(db: &Database, id: &str) -> Result<KitchenResource, String> {
    sqlx::query_as::<_, KitchenResource>("SELECT * FROM resources WHERE id = ?")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .map_err(|e| db_error(e.into()))
}

async fn create(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let name = require_str(args, "name", "create")?;
    let resource_type = opt_enum(args, "type", RESOURCE_TYPES)?;

    let new_id = next_id(db.pool(), "resource", "resources")
        .await
        .map_err(db_error)?;

    sqlx::query("INSERT INTO resources (id, name, type) VALUES (?, ?, ?)")
        .bind(&new_id)
        .bind(name)
        .bind(resource_type)
        .execute(db.pool())
        .await
        .map_err(|e| db_error(e.into()))?;

    echo_row(&fetch(db, &new_id).await?)
}

async fn update(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "update")?;

    let mut set = UpdateSet::new();
    set.push_str("name", opt_str(args, "name")?);
    set.push_str("type", opt_enum(args, "type", RESOURCE_TYPES)?);

    if set.is_empty() {
        return Err("No fields to update".to_owned());
    }
    if set.execute(db, "resources", id).await? == 0 {
        return Err(format!("Resource {id} not found"));
    }

    echo_row(&fetch(db, id).await?)
}

async fn delete(db: &Database, args: &Value) -> Result<ToolResponse, String> {
    let id = require_str(args, "id", "delete")?;

    let mut tx = db.pool().begin().await.map_err(|e| db_error(e.into()))?;

    sqlx::query("DELETE FROM step_resource_usage WHERE resource_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?;

    let changes = sqlx::query("DELETE FROM resources WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e.into()))?
        .rows_affected();

    if changes == 0 {
        return Err(format!("Resource {id} not found"));
    }

    tx.commit().await.map_err(|e| db_error(e.into()))?;

    Ok(ToolResponse::text(format!("Deleted resource {id}")))
}
