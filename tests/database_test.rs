// ABOUTME: Integration tests for migrations, conversation records, and export
// ABOUTME: Covers stock views, maintenance triggers, and the textual dump
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Database layer tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{call_ok, echoed_id, test_db};
use serde_json::json;
use sous_mcp_server::database::ConversationStore;

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let db = test_db().await;
    db.migrate().await.expect("second migration run");
}

#[tokio::test]
async fn test_file_backed_database_is_created_on_first_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("sous.db");
    let url = format!("sqlite:{}", path.display());

    let db = sous_mcp_server::database::Database::new(&url).await.unwrap();
    assert_eq!(db.next_id("recipe", "recipes").await.unwrap(), "recipe_1");
    assert!(path.exists());
}

#[tokio::test]
async fn test_conversation_store_round_trip() {
    let db = test_db().await;
    let store = ConversationStore::new(db.pool().clone());

    assert!(store.list().await.unwrap().is_empty());
    assert!(store.get("conv-1").await.unwrap().is_none());

    let history = r#"[{"role":"user","content":"hola"}]"#;
    store.save("conv-1", "Primera", history).await.unwrap();
    store.save("conv-2", "Segunda", "[]").await.unwrap();

    let record = store.get("conv-1").await.unwrap().unwrap();
    assert_eq!(record.title.as_deref(), Some("Primera"));
    assert_eq!(record.history, history);

    let summaries = store.list().await.unwrap();
    assert_eq!(summaries.len(), 2);

    assert!(store.delete("conv-1").await.unwrap());
    assert!(!store.delete("conv-1").await.unwrap());
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_has_meal_prep_steps_follows_step_phases() {
    let db = test_db().await;

    let recipe = echoed_id(
        &call_ok(&db, "manage_recipes", json!({"action": "create", "name": "Milanesas"})).await,
    );
    let flag = || async {
        sqlx::query_scalar::<_, i64>("SELECT has_meal_prep_steps FROM recipes WHERE id = ?")
            .bind(&recipe)
            .fetch_one(db.pool())
            .await
            .unwrap()
    };
    assert_eq!(flag().await, 0);

    let step = echoed_id(
        &call_ok(
            &db,
            "manage_steps",
            json!({"action": "create", "recipe_id": &recipe, "description": "Empanar",
                   "phase": "meal-prep"}),
        )
        .await,
    );
    assert_eq!(flag().await, 1);

    call_ok(
        &db,
        "manage_steps",
        json!({"action": "update", "id": &step, "phase": "day-of-eating"}),
    )
    .await;
    assert_eq!(flag().await, 0);

    call_ok(
        &db,
        "manage_steps",
        json!({"action": "update", "id": &step, "phase": "meal-prep"}),
    )
    .await;
    call_ok(&db, "manage_steps", json!({"action": "delete", "id": &step})).await;
    assert_eq!(flag().await, 0);
}

#[tokio::test]
async fn test_stock_views_report_remaining_servings() {
    let db = test_db().await;

    let recipe = echoed_id(
        &call_ok(
            &db,
            "manage_recipes",
            json!({"action": "create", "name": "Guiso", "type": "main",
                   "fridge_shelf_life_days": 4, "frozen_shelf_life_days": 90}),
        )
        .await,
    );
    let session = echoed_id(
        &call_ok(&db, "manage_sessions", json!({"action": "create_session", "date": "2025-04-01"})).await,
    );
    let batch = echoed_id(
        &call_ok(
            &db,
            "manage_sessions",
            json!({"action": "create_batch", "session_id": &session, "recipe_id": &recipe,
                   "servings_produced": 10, "prep_date": "2025-04-01"}),
        )
        .await,
    );
    call_ok(
        &db,
        "manage_consumption",
        json!({"action": "create", "batch_id": &batch, "servings_consumed": 4,
               "consumption_date": "2025-04-02"}),
    )
    .await;

    let remaining: i64 =
        sqlx::query_scalar("SELECT servings_remaining FROM batch_stock WHERE batch_id = ?")
            .bind(&batch)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(remaining, 6);

    let fridge_expiry: String =
        sqlx::query_scalar("SELECT fridge_expiry FROM batch_stock WHERE batch_id = ?")
            .bind(&batch)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(fridge_expiry, "2025-04-05");

    let total: i64 = sqlx::query_scalar(
        "SELECT total_servings_remaining FROM recipe_stock WHERE recipe_id = ?",
    )
    .bind(&recipe)
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(total, 6);
}

#[tokio::test]
async fn test_export_dump_contains_ddl_and_escaped_inserts() {
    let db = test_db().await;

    call_ok(
        &db,
        "manage_recipes",
        json!({"action": "create", "name": "Ro's stew", "type": "main"}),
    )
    .await;

    let dump = db.export_dump().await.unwrap();

    assert!(dump.contains("CREATE TABLE recipes"));
    assert!(dump.contains("INSERT INTO recipes"));
    // Single quotes in data are doubled for SQL literals
    assert!(dump.contains("Ro''s stew"));
    // NULL columns render as the keyword, not a quoted string
    assert!(dump.contains("NULL"));
}
