// ABOUTME: Integration tests for the transactional mutation engine
// ABOUTME: Covers validation, id allocation, cascades, and replace semantics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Mutation engine tests: every action validates its required-field set,
//! cascades are total and atomic, ids are monotonic, and `set_*` actions
//! replace rather than merge.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{call_err, call_ok, count, echoed_id, test_db};
use serde_json::{json, Value};
use sous_mcp_server::database::Database;

async fn seed_recipe(db: &Database, name: &str) -> String {
    let text = call_ok(db, "manage_recipes", json!({"action": "create", "name": name})).await;
    echoed_id(&text)
}

async fn seed_step(db: &Database, recipe_id: &str, description: &str) -> String {
    let text = call_ok(
        db,
        "manage_steps",
        json!({"action": "create", "recipe_id": recipe_id, "description": description}),
    )
    .await;
    echoed_id(&text)
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_missing_required_fields_leave_store_unmodified() {
    let db = test_db().await;

    // (tool, args, table expected untouched)
    let cases: Vec<(&str, Value, &str)> = vec![
        ("manage_recipes", json!({"action": "create"}), "recipes"),
        ("manage_recipes", json!({"action": "update", "name": "x"}), "recipes"),
        ("manage_recipes", json!({"action": "delete"}), "recipes"),
        ("manage_steps", json!({"action": "create", "description": "d"}), "steps"),
        ("manage_steps", json!({"action": "create", "recipe_id": "recipe_1"}), "steps"),
        ("manage_steps", json!({"action": "set_dependencies", "id": "step_1"}), "step_dependencies"),
        ("manage_steps", json!({"action": "set_ingredients", "id": "step_1"}), "step_ingredients"),
        ("manage_steps", json!({"action": "set_resources", "id": "step_1"}), "step_resource_usage"),
        ("manage_ingredients", json!({"action": "create"}), "ingredients"),
        ("manage_resources", json!({"action": "create"}), "resources"),
        ("manage_sessions", json!({"action": "create_session"}), "meal_prep_sessions"),
        (
            "manage_sessions",
            json!({"action": "create_batch", "recipe_id": "r", "servings_produced": 4, "prep_date": "2025-01-01"}),
            "batches",
        ),
        (
            "manage_consumption",
            json!({"action": "create", "batch_id": "b", "servings_consumed": 1}),
            "consumptions",
        ),
        ("manage_meal_plan", json!({"action": "create_week"}), "weeks"),
        (
            "manage_meal_plan",
            json!({"action": "set_meal_slot", "week_id": "w", "day_of_week": "Monday"}),
            "meal_plan_slots",
        ),
    ];

    for (tool, args, table) in cases {
        let before = count(&db, table).await;
        let text = call_err(&db, tool, args.clone()).await;
        assert!(
            text.contains("required"),
            "{tool} {args} should report a missing field, got: {text}"
        );
        assert_eq!(count(&db, table).await, before, "{tool} modified {table}");
    }
}

#[tokio::test]
async fn test_enum_violations_are_validation_errors() {
    let db = test_db().await;

    let text = call_err(
        &db,
        "manage_recipes",
        json!({"action": "create", "name": "Guiso", "type": "dessert"}),
    )
    .await;
    assert!(text.contains("type must be one of"));
    assert_eq!(count(&db, "recipes").await, 0);

    let text = call_err(
        &db,
        "manage_meal_plan",
        json!({"action": "set_meal_slot", "week_id": "w", "day_of_week": "Funday",
               "meal_type": "lunch", "recipe_ids": []}),
    )
    .await;
    assert!(text.contains("day_of_week must be one of"));
}

#[tokio::test]
async fn test_wrong_types_are_validation_errors() {
    let db = test_db().await;

    let text = call_err(
        &db,
        "manage_recipes",
        json!({"action": "create", "name": "Guiso", "servings": "four"}),
    )
    .await;
    assert!(text.contains("servings must be an integer"));
}

#[tokio::test]
async fn test_unknown_tool_and_action_are_returned_errors() {
    let db = test_db().await;

    let text = call_err(&db, "manage_pets", json!({"action": "create"})).await;
    assert!(text.contains("Unknown tool"));

    let text = call_err(&db, "manage_recipes", json!({"action": "merge"})).await;
    assert!(text.contains("Unknown action"));
}

#[tokio::test]
async fn test_update_with_no_fields_is_rejected() {
    let db = test_db().await;
    let recipe_id = seed_recipe(&db, "Milanesas").await;

    let text = call_err(&db, "manage_recipes", json!({"action": "update", "id": recipe_id})).await;
    assert_eq!(text, "No fields to update");
}

#[tokio::test]
async fn test_update_and_delete_of_missing_rows_are_not_found() {
    let db = test_db().await;

    let text = call_err(
        &db,
        "manage_recipes",
        json!({"action": "update", "id": "recipe_99", "name": "x"}),
    )
    .await;
    assert_eq!(text, "Recipe recipe_99 not found");

    let text = call_err(&db, "manage_recipes", json!({"action": "delete", "id": "recipe_99"})).await;
    assert_eq!(text, "Recipe recipe_99 not found");

    let text = call_err(
        &db,
        "manage_consumption",
        json!({"action": "delete", "id": "consumption_7"}),
    )
    .await;
    assert_eq!(text, "Consumption consumption_7 not found");
}

// ============================================================================
// Id Allocation
// ============================================================================

#[tokio::test]
async fn test_next_id_is_monotonic_and_gaps_are_not_reused() {
    let db = test_db().await;

    assert_eq!(db.next_id("ingredient", "ingredients").await.unwrap(), "ingredient_1");

    for name in ["Cebolla", "Huevos", "Harina"] {
        call_ok(&db, "manage_ingredients", json!({"action": "create", "name": name})).await;
    }
    call_ok(&db, "manage_ingredients", json!({"action": "delete", "id": "ingredient_2"})).await;

    assert_eq!(db.next_id("ingredient", "ingredients").await.unwrap(), "ingredient_4");
}

#[tokio::test]
async fn test_create_echoes_post_state_row() {
    let db = test_db().await;

    let text = call_ok(
        &db,
        "manage_recipes",
        json!({"action": "create", "name": "Milanesas", "type": "main", "servings": 6}),
    )
    .await;
    let row: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(row["id"], "recipe_1");
    assert_eq!(row["name"], "Milanesas");
    assert_eq!(row["type"], "main");
    assert_eq!(row["servings"], 6);
    assert_eq!(row["yield_amount"], Value::Null);
}

#[tokio::test]
async fn test_update_echoes_post_state_row() {
    let db = test_db().await;
    let recipe_id = seed_recipe(&db, "Guiso").await;

    let text = call_ok(
        &db,
        "manage_recipes",
        json!({"action": "update", "id": recipe_id, "servings": 8, "type": "main"}),
    )
    .await;
    let row: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(row["name"], "Guiso");
    assert_eq!(row["servings"], 8);
    assert_eq!(row["type"], "main");
}

// ============================================================================
// Cascades
// ============================================================================

#[tokio::test]
async fn test_recipe_delete_cascades_over_every_dependent_table() {
    let db = test_db().await;

    let recipe_id = seed_recipe(&db, "Milanesas").await;
    let other_recipe = seed_recipe(&db, "Ensalada").await;

    let step_a = seed_step(&db, &recipe_id, "Empanar").await;
    let step_b = seed_step(&db, &recipe_id, "Freir").await;
    let other_step = seed_step(&db, &other_recipe, "Cortar").await;

    call_ok(
        &db,
        "manage_steps",
        json!({"action": "set_dependencies", "id": &step_b, "depends_on_step_ids": [&step_a]}),
    )
    .await;

    let ingredient = echoed_id(
        &call_ok(&db, "manage_ingredients", json!({"action": "create", "name": "Huevos"})).await,
    );
    call_ok(
        &db,
        "manage_steps",
        json!({"action": "set_ingredients", "id": &step_a,
               "ingredients": [{"ingredient_id": &ingredient, "quantity": "2"}]}),
    )
    .await;

    let resource = echoed_id(
        &call_ok(&db, "manage_resources", json!({"action": "create", "name": "Sarten", "type": "pan"})).await,
    );
    call_ok(
        &db,
        "manage_steps",
        json!({"action": "set_resources", "id": &step_b,
               "resources": [{"resource_id": &resource, "temperature_celsius": 180}]}),
    )
    .await;

    let session = echoed_id(
        &call_ok(&db, "manage_sessions", json!({"action": "create_session", "date": "2025-06-01"})).await,
    );
    let batch = echoed_id(
        &call_ok(
            &db,
            "manage_sessions",
            json!({"action": "create_batch", "session_id": &session, "recipe_id": &recipe_id,
                   "servings_produced": 8, "prep_date": "2025-06-01"}),
        )
        .await,
    );
    call_ok(
        &db,
        "manage_consumption",
        json!({"action": "create", "batch_id": &batch, "servings_consumed": 2,
               "consumption_date": "2025-06-02"}),
    )
    .await;

    let week = echoed_id(
        &call_ok(&db, "manage_meal_plan", json!({"action": "create_week", "start_date": "2025-06-02"})).await,
    );
    call_ok(
        &db,
        "manage_meal_plan",
        json!({"action": "set_meal_slot", "week_id": &week, "day_of_week": "Monday",
               "meal_type": "lunch", "recipe_ids": [&recipe_id, &other_recipe]}),
    )
    .await;

    let text = call_ok(&db, "manage_recipes", json!({"action": "delete", "id": &recipe_id})).await;
    assert!(text.contains("Deleted recipe"));

    // Every row keyed into the deleted recipe is gone
    for (table, filter) in [
        ("steps", format!("recipe_id = '{recipe_id}'")),
        ("step_dependencies", format!("step_id = '{step_a}' OR step_id = '{step_b}'")),
        ("step_ingredients", format!("step_id = '{step_a}'")),
        ("step_resource_usage", format!("step_id = '{step_b}'")),
        ("batches", format!("recipe_id = '{recipe_id}'")),
        ("consumptions", format!("batch_id = '{batch}'")),
        ("meal_plan_slot_recipes", format!("recipe_id = '{recipe_id}'")),
        ("recipes", format!("id = '{recipe_id}'")),
    ] {
        let remaining: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE {filter}"))
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(remaining, 0, "{table} still holds rows for the deleted recipe");
    }

    // Unrelated rows survive
    assert_eq!(count(&db, "recipes").await, 1);
    let other_steps: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM steps WHERE recipe_id = ?")
            .bind(&other_recipe)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(other_steps, 1);
    let slot_recipes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM meal_plan_slot_recipes WHERE recipe_id = ?")
            .bind(&other_recipe)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(slot_recipes, 1);
    let _ = other_step;
}

#[tokio::test]
async fn test_session_delete_cascades_batches_and_consumptions() {
    let db = test_db().await;
    let recipe = seed_recipe(&db, "Guiso").await;
    let session = echoed_id(
        &call_ok(&db, "manage_sessions", json!({"action": "create_session", "date": "2025-03-01"})).await,
    );
    let batch = echoed_id(
        &call_ok(
            &db,
            "manage_sessions",
            json!({"action": "create_batch", "session_id": &session, "recipe_id": &recipe,
                   "servings_produced": 10, "prep_date": "2025-03-01"}),
        )
        .await,
    );
    call_ok(
        &db,
        "manage_consumption",
        json!({"action": "create", "batch_id": &batch, "servings_consumed": 3,
               "consumption_date": "2025-03-02"}),
    )
    .await;

    call_ok(&db, "manage_sessions", json!({"action": "delete_session", "id": session})).await;

    assert_eq!(count(&db, "meal_prep_sessions").await, 0);
    assert_eq!(count(&db, "batches").await, 0);
    assert_eq!(count(&db, "consumptions").await, 0);
}

#[tokio::test]
async fn test_ingredient_delete_removes_step_usage_references() {
    let db = test_db().await;
    let recipe = seed_recipe(&db, "Tortilla").await;
    let step = seed_step(&db, &recipe, "Batir").await;
    let ingredient = echoed_id(
        &call_ok(&db, "manage_ingredients", json!({"action": "create", "name": "Huevos", "type": "Other"})).await,
    );
    call_ok(
        &db,
        "manage_steps",
        json!({"action": "set_ingredients", "id": &step,
               "ingredients": [{"ingredient_id": &ingredient, "quantity": "3", "unit": "un"}]}),
    )
    .await;

    call_ok(&db, "manage_ingredients", json!({"action": "delete", "id": ingredient})).await;

    assert_eq!(count(&db, "ingredients").await, 0);
    assert_eq!(count(&db, "step_ingredients").await, 0);
}

// ============================================================================
// Replace Semantics
// ============================================================================

#[tokio::test]
async fn test_set_dependencies_replaces_not_merges() {
    let db = test_db().await;
    let recipe = seed_recipe(&db, "Pastel").await;
    let a = seed_step(&db, &recipe, "a").await;
    let b = seed_step(&db, &recipe, "b").await;
    let c = seed_step(&db, &recipe, "c").await;
    let d = seed_step(&db, &recipe, "d").await;

    call_ok(
        &db,
        "manage_steps",
        json!({"action": "set_dependencies", "id": &d, "depends_on_step_ids": [&a, &b]}),
    )
    .await;
    let text = call_ok(
        &db,
        "manage_steps",
        json!({"action": "set_dependencies", "id": &d, "depends_on_step_ids": [&c]}),
    )
    .await;
    assert!(text.contains("Set 1 dependencies"));

    let deps: Vec<String> =
        sqlx::query_scalar("SELECT depends_on_step_id FROM step_dependencies WHERE step_id = ?")
            .bind(&d)
            .fetch_all(db.pool())
            .await
            .unwrap();
    assert_eq!(deps, vec![c]);
}

#[tokio::test]
async fn test_set_meal_slot_finds_or_creates_and_replaces() {
    let db = test_db().await;
    let recipe_a = seed_recipe(&db, "Milanesas").await;
    let recipe_b = seed_recipe(&db, "Ensalada").await;
    let week = echoed_id(
        &call_ok(&db, "manage_meal_plan", json!({"action": "create_week", "start_date": "2025-06-02"})).await,
    );

    call_ok(
        &db,
        "manage_meal_plan",
        json!({"action": "set_meal_slot", "week_id": &week, "day_of_week": "Tuesday",
               "meal_type": "dinner", "recipe_ids": [&recipe_a, &recipe_b]}),
    )
    .await;
    assert_eq!(count(&db, "meal_plan_slots").await, 1);
    assert_eq!(count(&db, "meal_plan_slot_recipes").await, 2);

    // Same slot coordinates: reuse the slot, replace the assignment set
    call_ok(
        &db,
        "manage_meal_plan",
        json!({"action": "set_meal_slot", "week_id": &week, "day_of_week": "Tuesday",
               "meal_type": "dinner", "recipe_ids": [&recipe_b]}),
    )
    .await;
    assert_eq!(count(&db, "meal_plan_slots").await, 1);
    assert_eq!(count(&db, "meal_plan_slot_recipes").await, 1);

    let assigned: String =
        sqlx::query_scalar("SELECT recipe_id FROM meal_plan_slot_recipes")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(assigned, recipe_b);
}

// ============================================================================
// End-to-End Flow
// ============================================================================

#[tokio::test]
async fn test_create_create_delete_flow() {
    let db = test_db().await;

    let first = seed_recipe(&db, "Milanesas").await;
    assert_eq!(first, "recipe_1");
    let second = seed_recipe(&db, "Guiso").await;
    assert_eq!(second, "recipe_2");

    seed_step(&db, &first, "Empanar").await;
    let session = echoed_id(
        &call_ok(&db, "manage_sessions", json!({"action": "create_session", "date": "2025-05-05"})).await,
    );
    call_ok(
        &db,
        "manage_sessions",
        json!({"action": "create_batch", "session_id": &session, "recipe_id": &first,
               "servings_produced": 4, "prep_date": "2025-05-05"}),
    )
    .await;

    call_ok(&db, "manage_recipes", json!({"action": "delete", "id": first})).await;

    let steps: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM steps WHERE recipe_id = 'recipe_1'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    let batches: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE recipe_id = 'recipe_1'")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(steps, 0);
    assert_eq!(batches, 0);
    assert_eq!(count(&db, "recipes").await, 1);
}
