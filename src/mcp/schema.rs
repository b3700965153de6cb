// ABOUTME: MCP protocol schema definitions and the declared tool catalogue
// ABOUTME: Defines JSON-RPC structures, tool schemas, and tool response shapes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! MCP Protocol Schema Definitions
//!
//! Type-safe definitions for MCP protocol messages and the tool catalogue.
//! The catalogue carries two access tiers: the read-only `query` tool and
//! the `manage_*` family routed through the transactional mutation engine.
//! The unrestricted `execute_sql` batch tool is deliberately NOT part of
//! this catalogue; it belongs to the conversational UI path.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::{protocol, tools};

/// Server information advertised during initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Value,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

impl InitializeResponse {
    /// Build the standard initialize response for this server
    #[must_use]
    pub fn new() -> Self {
        Self {
            protocol_version: protocol::MCP_PROTOCOL_VERSION.to_owned(),
            capabilities: json!({
                "tools": {},
                "resources": {}
            }),
            server_info: ServerInfo {
                name: protocol::SERVER_NAME.to_owned(),
                version: protocol::SERVER_VERSION.to_owned(),
            },
        }
    }
}

impl Default for InitializeResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// MCP Tool Schema Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Content types for MCP tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

/// Tool response after execution.
///
/// Validation failures, not-found targets, and SQL errors all surface
/// through `is_error` with descriptive text — returned, never thrown — so
/// the conversation loop can feed them back to the model as ordinary tool
/// results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<Content>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResponse {
    /// Successful response with one text block
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Error response with one text block
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Concatenated text of all content blocks
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|Content::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Get the declared tool catalogue (constrained tier only)
#[must_use]
pub fn get_tools() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: tools::QUERY.to_owned(),
            description: "Execute a read-only SQL query against the meal-prep database. \
                Supports SELECT, WITH...SELECT, and EXPLAIN statements. Use the \
                sous://schema resource to discover table structures."
                .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sql": {"type": "string", "description": "The SQL query to execute (read-only)"}
                },
                "required": ["sql"]
            }),
        },
        ToolSchema {
            name: tools::MANAGE_RECIPES.to_owned(),
            description: "Create, update, or delete recipes. Deleting a recipe cascades to \
                its steps, ingredient/resource associations, batches, and meal plan references."
                .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["create", "update", "delete"],
                               "description": "The operation to perform"},
                    "id": {"type": "string", "description": "Recipe ID (required for update and delete)"},
                    "name": {"type": "string", "description": "Recipe name (required for create)"},
                    "type": {"type": "string", "enum": ["main", "side", "base"],
                             "description": "Recipe type"},
                    "servings": {"type": "integer", "description": "Number of servings"},
                    "yield_amount": {"type": "number", "description": "Yield amount"},
                    "yield_unit": {"type": "string", "description": "Yield unit (e.g. 'grams', 'ml')"},
                    "frozen_shelf_life_days": {"type": "integer",
                                               "description": "Days the recipe lasts frozen"},
                    "fridge_shelf_life_days": {"type": "integer",
                                               "description": "Days the recipe lasts in the fridge"}
                },
                "required": ["action"]
            }),
        },
        ToolSchema {
            name: tools::MANAGE_STEPS.to_owned(),
            description: "Manage recipe steps and their associations. Create/update/delete \
                steps, and set their dependencies, ingredient usage, and resource usage. \
                The set_* actions replace all existing associations for the given step."
                .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string",
                               "enum": ["create", "update", "delete", "set_dependencies",
                                        "set_ingredients", "set_resources"],
                               "description": "The operation to perform"},
                    "id": {"type": "string",
                           "description": "Step ID (required for update, delete, set_dependencies, set_ingredients, set_resources)"},
                    "recipe_id": {"type": "string", "description": "Recipe ID (required for create)"},
                    "description": {"type": "string", "description": "Step description (required for create)"},
                    "phase": {"type": "string", "enum": ["meal-prep", "day-of-eating"],
                              "description": "When this step happens"},
                    "order_num": {"type": "integer", "description": "Step order within the recipe"},
                    "duration_minutes": {"type": "integer", "description": "How long this step takes in minutes"},
                    "depends_on_step_ids": {
                        "type": "array", "items": {"type": "string"},
                        "description": "Step IDs this step depends on (for set_dependencies - replaces all existing)"
                    },
                    "ingredients": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "ingredient_id": {"type": "string"},
                                "quantity": {"type": "string"},
                                "unit": {"type": "string"}
                            },
                            "required": ["ingredient_id"]
                        },
                        "description": "Ingredients used in this step (for set_ingredients - replaces all existing)"
                    },
                    "resources": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "resource_id": {"type": "string"},
                                "temperature_celsius": {"type": "integer"},
                                "notes": {"type": "string"}
                            },
                            "required": ["resource_id"]
                        },
                        "description": "Resources used in this step (for set_resources - replaces all existing)"
                    }
                },
                "required": ["action"]
            }),
        },
        ToolSchema {
            name: tools::MANAGE_INGREDIENTS.to_owned(),
            description: "Create, update, or delete ingredients used in recipes. Deleting an \
                ingredient also removes all step_ingredients references to it. IMPORTANT: \
                Before creating a new ingredient, search existing ingredients for similar \
                names (singular/plural variants, abbreviations, synonyms) and reuse the \
                existing ingredient instead of creating a duplicate."
                .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["create", "update", "delete"],
                               "description": "The operation to perform"},
                    "id": {"type": "string", "description": "Ingredient ID (required for update and delete)"},
                    "name": {"type": "string", "description": "Ingredient name (required for create)"},
                    "type": {"type": "string",
                             "enum": ["Meat", "Poultry", "Fish", "Vegetables", "Fruits", "Dairy",
                                      "Deli/Cheese", "Pantry/Canned", "Condiments", "Other"],
                             "description": "Ingredient category"}
                },
                "required": ["action"]
            }),
        },
        ToolSchema {
            name: tools::MANAGE_RESOURCES.to_owned(),
            description: "Create, update, or delete kitchen resources (oven, pan, pot, stove) \
                used in recipe steps. Deleting a resource also removes all \
                step_resource_usage references to it."
                .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["create", "update", "delete"],
                               "description": "The operation to perform"},
                    "id": {"type": "string", "description": "Resource ID (required for update and delete)"},
                    "name": {"type": "string", "description": "Resource name (required for create)"},
                    "type": {"type": "string", "enum": ["oven", "pan", "pot", "stove"],
                             "description": "Resource type"}
                },
                "required": ["action"]
            }),
        },
        ToolSchema {
            name: tools::MANAGE_SESSIONS.to_owned(),
            description: "Manage meal prep sessions and the batches produced during them. A \
                session represents a day of meal prep; batches track how many servings of \
                each recipe were produced."
                .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string",
                               "enum": ["create_session", "update_session", "delete_session",
                                        "create_batch", "update_batch", "delete_batch"],
                               "description": "The operation to perform"},
                    "id": {"type": "string",
                           "description": "Session ID (for update/delete_session) or Batch ID (for update/delete_batch)"},
                    "date": {"type": "string",
                             "description": "Session date in YYYY-MM-DD format (required for create_session)"},
                    "notes": {"type": "string", "description": "Session notes"},
                    "gantt": {"type": "string",
                              "description": "Schedule diagram for the session in .gantt format (plain text DSL). \
                                  Sections: VERSION 1, START/END HH:MM, LANES (one per line - lanes represent \
                                  people, equipment, or appliances), TASKS (pipe-separated: Name | Duration | \
                                  Lane(s) | Color | Dependencies | @Start). Duration: 15m, 1h, 1h30m. \
                                  Dependencies: 'after Task A, Task B'. Pinned time: '@09:30'."},
                    "session_id": {"type": "string", "description": "Session ID (required for create_batch)"},
                    "recipe_id": {"type": "string", "description": "Recipe ID (required for create_batch)"},
                    "servings_produced": {"type": "integer",
                                          "description": "Number of servings produced (required for create_batch)"},
                    "prep_date": {"type": "string",
                                  "description": "Batch prep date in YYYY-MM-DD format (required for create_batch)"}
                },
                "required": ["action"]
            }),
        },
        ToolSchema {
            name: tools::MANAGE_CONSUMPTION.to_owned(),
            description: "Record, update, or delete consumption entries that track servings \
                eaten from batches."
                .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["create", "update", "delete"],
                               "description": "The operation to perform"},
                    "id": {"type": "string", "description": "Consumption ID (required for update and delete)"},
                    "batch_id": {"type": "string", "description": "Batch ID (required for create)"},
                    "servings_consumed": {"type": "integer",
                                          "description": "Number of servings consumed (required for create)"},
                    "consumption_date": {"type": "string",
                                         "description": "Date of consumption in YYYY-MM-DD format (required for create)"}
                },
                "required": ["action"]
            }),
        },
        ToolSchema {
            name: tools::MANAGE_MEAL_PLAN.to_owned(),
            description: "Manage weekly meal plans. Create/update/delete weeks, and assign \
                recipes to meal slots (day + meal type). set_meal_slot finds or creates the \
                slot and replaces all its recipe assignments."
                .to_owned(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string",
                               "enum": ["create_week", "update_week", "delete_week",
                                        "set_meal_slot", "delete_meal_slot"],
                               "description": "The operation to perform"},
                    "id": {"type": "string",
                           "description": "Week ID (for update_week, delete_week) or Slot ID (for delete_meal_slot)"},
                    "start_date": {"type": "string",
                                   "description": "Week start date in YYYY-MM-DD format (required for create_week)"},
                    "notes": {"type": "string", "description": "Notes for the week"},
                    "week_id": {"type": "string", "description": "Week ID (required for set_meal_slot)"},
                    "day_of_week": {"type": "string",
                                    "enum": ["Monday", "Tuesday", "Wednesday", "Thursday",
                                             "Friday", "Saturday", "Sunday"],
                                    "description": "Day of the week (required for set_meal_slot)"},
                    "meal_type": {"type": "string", "enum": ["lunch", "dinner"],
                                  "description": "Meal type (required for set_meal_slot)"},
                    "recipe_ids": {"type": "array", "items": {"type": "string"},
                                   "description": "Recipe IDs to assign to the slot (required for set_meal_slot)"}
                },
                "required": ["action"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_excludes_execute_sql() {
        let tools = get_tools();
        assert_eq!(tools.len(), 8);
        assert!(tools.iter().all(|t| t.name != crate::constants::tools::EXECUTE_SQL));
        assert!(tools.iter().any(|t| t.name == crate::constants::tools::QUERY));
    }

    #[test]
    fn test_tool_response_text_content() {
        let response = ToolResponse::error("id is required for update");
        assert!(response.is_error);
        assert_eq!(response.text_content(), "id is required for update");
    }
}
