// ABOUTME: Domain entity row types mapped to the meal-prep tables
// ABOUTME: Used by the mutation engine to echo post-state rows back to the model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Domain entity row types.
//!
//! Each struct maps one table and serializes to the JSON shape echoed by
//! successful create/update tool calls.

use serde::{Deserialize, Serialize};

/// A recipe and its yield/shelf-life metadata
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub recipe_type: Option<String>,
    pub servings: Option<i64>,
    pub yield_amount: Option<f64>,
    pub yield_unit: Option<String>,
    pub frozen_shelf_life_days: Option<i64>,
    pub fridge_shelf_life_days: Option<i64>,
    /// Maintained by triggers: 1 when the recipe has any meal-prep steps
    pub has_meal_prep_steps: i64,
}

/// An ingredient usable in recipe steps
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub ingredient_type: Option<String>,
}

/// A preparation step belonging to a recipe
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Step {
    pub id: String,
    pub recipe_id: String,
    pub description: String,
    pub phase: Option<String>,
    pub order_num: Option<i64>,
    pub duration_minutes: Option<i64>,
}

/// A kitchen resource (oven, pan, pot, stove)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KitchenResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub resource_type: Option<String>,
}

/// A meal prep session (one day of cooking)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PrepSession {
    pub id: String,
    pub date: String,
    pub notes: Option<String>,
    /// Plain-text schedule DSL payload for the session
    pub gantt: Option<String>,
}

/// A batch of servings produced during a session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Batch {
    pub id: String,
    pub recipe_id: String,
    pub session_id: String,
    pub servings_produced: i64,
    pub prep_date: String,
}

/// A consumption record against a batch
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Consumption {
    pub id: String,
    pub batch_id: String,
    pub servings_consumed: i64,
    pub consumption_date: String,
}

/// A planning week
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Week {
    pub id: String,
    pub start_date: String,
    pub notes: Option<String>,
}

/// A meal slot (week + day + meal type)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MealSlot {
    pub id: String,
    pub week_id: String,
    pub day_of_week: Option<String>,
    pub meal_type: Option<String>,
}
