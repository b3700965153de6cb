// ABOUTME: SQLite database management with in-code migrations and id allocation
// ABOUTME: Owns the connection pool, the conversation record store, and the export dump
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # Database Management
//!
//! This module provides database functionality for the Sous MCP Server:
//! the shared SQLite pool, schema migrations run at startup, monotonic
//! display-id allocation, the flat conversation record store, and the
//! plain-text export dump.

use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use tracing::info;

use crate::errors::{AppError, AppResult};

/// Database manager for the meal-prep store
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Compute the next display id for a table/prefix pair.
///
/// Ids have the form `<prefix>_<n>`; the next id is the maximum numeric
/// suffix among existing rows matching `prefix_%` plus one, defaulting to
/// one for an empty table. Gaps left by deletions are not reused.
///
/// Generic over the executor so callers inside a transaction allocate
/// against the transaction's view of the table.
///
/// # Errors
///
/// Returns a database error if the scan query fails.
pub async fn next_id<'a, E>(executor: E, prefix: &str, table: &str) -> AppResult<String>
where
    E: sqlx::Executor<'a, Database = Sqlite>,
{
    // SUBSTR is 1-indexed; skip "<prefix>_" to reach the numeric suffix.
    let start = i64::try_from(prefix.len() + 2)
        .map_err(|_| AppError::internal("id prefix too long"))?;
    let sql =
        format!(r#"SELECT MAX(CAST(SUBSTR(id, ?) AS INTEGER)) FROM "{table}" WHERE id LIKE ?"#);
    let max_num: Option<i64> = sqlx::query_scalar(&sql)
        .bind(start)
        .bind(format!("{prefix}_%"))
        .fetch_one(executor)
        .await?;
    Ok(format!("{prefix}_{}", max_num.unwrap_or(0) + 1))
}

impl Database {
    /// Create a new database connection and run migrations.
    ///
    /// The SQLite file is created if it does not exist, including parent
    /// directories for `sqlite:` file URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        if let Some(path) = database_url.strip_prefix("sqlite:") {
            if path != ":memory:" {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            AppError::database(format!("Failed to create database directory: {e}"))
                        })?;
                    }
                }
            }
        }

        // mode=rwc makes SQLite create the file on first open
        let connection_options = if database_url.starts_with("sqlite:")
            && !database_url.ends_with(":memory:")
            && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connection_options).await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Access the underlying pool
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Allocate the next display id for a table/prefix pair
    ///
    /// # Errors
    ///
    /// Returns a database error if the scan query fails.
    pub async fn next_id(&self, prefix: &str, table: &str) -> AppResult<String> {
        next_id(&self.pool, prefix, table).await
    }

    /// Run database migrations: domain tables, stock views, and the
    /// `has_meal_prep_steps` maintenance triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if any migration statement fails.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Database migrations complete");
        Ok(())
    }

    /// Produce a plain-text dump: every table's DDL followed by its rows
    /// as literal `INSERT` statements.
    ///
    /// Not transactional with respect to concurrent writers.
    ///
    /// # Errors
    ///
    /// Returns an error if any table cannot be read.
    pub async fn export_dump(&self) -> AppResult<String> {
        let mut dump: Vec<String> = Vec::new();

        let tables: Vec<(String, String)> = sqlx::query_as(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND sql IS NOT NULL AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        for (_, sql) in &tables {
            dump.push(format!("{sql};"));
        }

        for (name, _) in &tables {
            let rows = sqlx::query(&format!(r#"SELECT * FROM "{name}""#))
                .fetch_all(&self.pool)
                .await?;
            for row in &rows {
                dump.push(render_insert(name, row)?);
            }
        }

        Ok(dump.join("\n"))
    }
}

/// Render one row as a literal `INSERT` statement with SQL-escaped values
fn render_insert(table: &str, row: &sqlx::sqlite::SqliteRow) -> AppResult<String> {
    use sqlx::{Column, Row};

    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for column in row.columns() {
        columns.push(column.name().to_owned());
        let value = crate::sql::column_value(row, column.ordinal())?;
        values.push(render_literal(&value));
    }

    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({});",
        columns.join(","),
        values.join(",")
    ))
}

/// Render a JSON value as a SQL literal (single quotes doubled)
fn render_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_owned(),
        serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => other.to_string(),
    }
}

// ============================================================================
// Conversation Record Store
// ============================================================================

/// Summary of a conversation for listing (history omitted)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationSummary {
    /// Conversation id
    pub id: String,
    /// Conversation title
    pub title: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

/// Full conversation record including the serialized message history
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationRecord {
    /// Conversation id
    pub id: String,
    /// Conversation title
    pub title: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
    /// Serialized message list
    pub history: String,
}

/// Flat record store for conversations: load/save/list/delete by opaque id.
///
/// The store treats history as an opaque serialized payload; the chat
/// orchestrator owns its structure for the duration of a turn.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    pool: Pool<Sqlite>,
}

impl ConversationStore {
    /// Create a store over the shared pool
    #[must_use]
    pub const fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// List conversation summaries, most recently updated first
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn list(&self) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query_as::<_, ConversationSummary>(
            "SELECT id, title, created_at, updated_at FROM conversations \
             ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Load a conversation record by id
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn get(&self, id: &str) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query_as::<_, ConversationRecord>(
            "SELECT id, title, created_at, updated_at, history FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Insert or replace a conversation record, refreshing `updated_at`
    ///
    /// # Errors
    ///
    /// Returns a database error if the write fails.
    pub async fn save(&self, id: &str, title: &str, history: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO conversations (id, title, history, updated_at) \
             VALUES (?, ?, ?, CURRENT_TIMESTAMP)",
        )
        .bind(id)
        .bind(title)
        .bind(history)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a conversation record; returns whether a row was removed
    ///
    /// # Errors
    ///
    /// Returns a database error if the delete fails.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Migration statements executed in order at startup.
///
/// Every statement is idempotent (`IF NOT EXISTS` or additive trigger
/// definitions) so migration can run on every boot.
const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS recipes (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        type TEXT CHECK(type IN ('main','side','base')),
        servings INTEGER,
        yield_amount REAL,
        yield_unit TEXT,
        frozen_shelf_life_days INTEGER,
        fridge_shelf_life_days INTEGER,
        has_meal_prep_steps INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS ingredients (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        type TEXT CHECK(type IN ('Meat','Poultry','Fish','Vegetables','Fruits','Dairy','Deli/Cheese','Pantry/Canned','Condiments','Other'))
    )",
    "CREATE TABLE IF NOT EXISTS steps (
        id TEXT PRIMARY KEY,
        recipe_id TEXT NOT NULL,
        description TEXT NOT NULL,
        phase TEXT CHECK(phase IN ('meal-prep','day-of-eating')),
        order_num INTEGER,
        duration_minutes INTEGER,
        FOREIGN KEY (recipe_id) REFERENCES recipes(id)
    )",
    "CREATE TABLE IF NOT EXISTS step_dependencies (
        step_id TEXT NOT NULL,
        depends_on_step_id TEXT NOT NULL,
        PRIMARY KEY (step_id, depends_on_step_id),
        FOREIGN KEY (step_id) REFERENCES steps(id),
        FOREIGN KEY (depends_on_step_id) REFERENCES steps(id)
    )",
    "CREATE TABLE IF NOT EXISTS step_ingredients (
        step_id TEXT NOT NULL,
        ingredient_id TEXT NOT NULL,
        quantity TEXT,
        unit TEXT,
        PRIMARY KEY (step_id, ingredient_id),
        FOREIGN KEY (step_id) REFERENCES steps(id),
        FOREIGN KEY (ingredient_id) REFERENCES ingredients(id)
    )",
    "CREATE TABLE IF NOT EXISTS resources (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        type TEXT CHECK(type IN ('oven','pan','pot','stove'))
    )",
    "CREATE TABLE IF NOT EXISTS step_resource_usage (
        step_id TEXT NOT NULL,
        resource_id TEXT NOT NULL,
        temperature_celsius INTEGER,
        notes TEXT,
        PRIMARY KEY (step_id, resource_id),
        FOREIGN KEY (step_id) REFERENCES steps(id),
        FOREIGN KEY (resource_id) REFERENCES resources(id)
    )",
    "CREATE TABLE IF NOT EXISTS meal_prep_sessions (
        id TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        notes TEXT,
        gantt TEXT
    )",
    "CREATE TABLE IF NOT EXISTS batches (
        id TEXT PRIMARY KEY,
        recipe_id TEXT NOT NULL,
        session_id TEXT NOT NULL,
        servings_produced INTEGER NOT NULL,
        prep_date TEXT NOT NULL,
        FOREIGN KEY (recipe_id) REFERENCES recipes(id),
        FOREIGN KEY (session_id) REFERENCES meal_prep_sessions(id)
    )",
    "CREATE TABLE IF NOT EXISTS consumptions (
        id TEXT PRIMARY KEY,
        batch_id TEXT NOT NULL,
        servings_consumed INTEGER NOT NULL,
        consumption_date TEXT NOT NULL,
        FOREIGN KEY (batch_id) REFERENCES batches(id)
    )",
    "CREATE TABLE IF NOT EXISTS weeks (
        id TEXT PRIMARY KEY,
        start_date TEXT NOT NULL,
        notes TEXT
    )",
    "CREATE TABLE IF NOT EXISTS meal_plan_slots (
        id TEXT PRIMARY KEY,
        week_id TEXT NOT NULL,
        day_of_week TEXT CHECK(day_of_week IN ('Monday','Tuesday','Wednesday','Thursday','Friday','Saturday','Sunday')),
        meal_type TEXT CHECK(meal_type IN ('lunch','dinner')),
        FOREIGN KEY (week_id) REFERENCES weeks(id)
    )",
    "CREATE TABLE IF NOT EXISTS meal_plan_slot_recipes (
        slot_id TEXT NOT NULL,
        recipe_id TEXT NOT NULL,
        PRIMARY KEY (slot_id, recipe_id),
        FOREIGN KEY (slot_id) REFERENCES meal_plan_slots(id),
        FOREIGN KEY (recipe_id) REFERENCES recipes(id)
    )",
    "CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        title TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        history TEXT NOT NULL
    )",
    // Stock views: remaining servings per batch and per recipe
    "CREATE VIEW IF NOT EXISTS batch_stock AS
    SELECT
      b.id AS batch_id,
      b.recipe_id,
      r.name AS recipe_name,
      r.type AS recipe_type,
      b.session_id,
      b.prep_date,
      b.servings_produced,
      COALESCE(SUM(c.servings_consumed), 0) AS servings_consumed,
      b.servings_produced - COALESCE(SUM(c.servings_consumed), 0) AS servings_remaining,
      DATE(b.prep_date, '+' || r.fridge_shelf_life_days || ' days') AS fridge_expiry,
      DATE(b.prep_date, '+' || r.frozen_shelf_life_days || ' days') AS freezer_expiry
    FROM batches b
    JOIN recipes r ON r.id = b.recipe_id
    LEFT JOIN consumptions c ON c.batch_id = b.id
    GROUP BY b.id",
    "CREATE VIEW IF NOT EXISTS recipe_stock AS
    SELECT
      recipe_id,
      recipe_name,
      recipe_type,
      SUM(servings_remaining) AS total_servings_remaining,
      MIN(prep_date) AS oldest_batch_date,
      MAX(prep_date) AS newest_batch_date,
      COUNT(*) AS batch_count
    FROM batch_stock
    WHERE servings_remaining > 0
    GROUP BY recipe_id",
    // Keep recipes.has_meal_prep_steps in sync with the steps table
    "CREATE TRIGGER IF NOT EXISTS update_has_meal_prep_steps_on_insert
    AFTER INSERT ON steps
    BEGIN
      UPDATE recipes
      SET has_meal_prep_steps = CASE
        WHEN EXISTS (
          SELECT 1 FROM steps
          WHERE recipe_id = NEW.recipe_id AND phase = 'meal-prep'
        ) THEN 1
        ELSE 0
      END
      WHERE id = NEW.recipe_id;
    END",
    "CREATE TRIGGER IF NOT EXISTS update_has_meal_prep_steps_on_update
    AFTER UPDATE OF phase ON steps
    BEGIN
      UPDATE recipes
      SET has_meal_prep_steps = CASE
        WHEN EXISTS (
          SELECT 1 FROM steps
          WHERE recipe_id = NEW.recipe_id AND phase = 'meal-prep'
        ) THEN 1
        ELSE 0
      END
      WHERE id = NEW.recipe_id;
    END",
    "CREATE TRIGGER IF NOT EXISTS update_has_meal_prep_steps_on_delete
    AFTER DELETE ON steps
    BEGIN
      UPDATE recipes
      SET has_meal_prep_steps = CASE
        WHEN EXISTS (
          SELECT 1 FROM steps
          WHERE recipe_id = OLD.recipe_id AND phase = 'meal-prep'
        ) THEN 1
        ELSE 0
      END
      WHERE id = OLD.recipe_id;
    END",
];
