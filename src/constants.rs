// ABOUTME: Application constants for protocol versions, tool names, and domain enums
// ABOUTME: Single source of truth for values shared between schemas, handlers, and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Application constants shared across modules

/// MCP protocol constants
pub mod protocol {
    /// JSON-RPC version used by all MCP messages
    pub const JSONRPC_VERSION: &str = "2.0";

    /// MCP protocol revision implemented by this server
    pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

    /// Server name advertised during initialization
    pub const SERVER_NAME: &str = "sous-mcp-server";

    /// Server version advertised during initialization
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// URI of the live schema resource
    pub const SCHEMA_RESOURCE_URI: &str = "sous://schema";
}

/// JSON-RPC error codes
pub mod jsonrpc_errors {
    /// Method not found
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid params
    pub const ERROR_INVALID_PARAMS: i32 = -32602;

    /// Internal error
    pub const ERROR_INTERNAL: i32 = -32603;
}

/// Tool names exposed to language models
pub mod tools {
    /// Read-only single-statement query tool
    pub const QUERY: &str = "query";

    /// Unrestricted batch SQL tool (chat UI path, not in the MCP catalogue)
    pub const EXECUTE_SQL: &str = "execute_sql";

    /// Recipe management tool
    pub const MANAGE_RECIPES: &str = "manage_recipes";

    /// Step and step-association management tool
    pub const MANAGE_STEPS: &str = "manage_steps";

    /// Ingredient management tool
    pub const MANAGE_INGREDIENTS: &str = "manage_ingredients";

    /// Kitchen resource management tool
    pub const MANAGE_RESOURCES: &str = "manage_resources";

    /// Meal prep session and batch management tool
    pub const MANAGE_SESSIONS: &str = "manage_sessions";

    /// Consumption tracking tool
    pub const MANAGE_CONSUMPTION: &str = "manage_consumption";

    /// Weekly meal plan management tool
    pub const MANAGE_MEAL_PLAN: &str = "manage_meal_plan";
}

/// Domain enum value sets enforced by tool validation and CHECK constraints
pub mod domain {
    /// Recipe types
    pub const RECIPE_TYPES: &[&str] = &["main", "side", "base"];

    /// Ingredient categories
    pub const INGREDIENT_TYPES: &[&str] = &[
        "Meat",
        "Poultry",
        "Fish",
        "Vegetables",
        "Fruits",
        "Dairy",
        "Deli/Cheese",
        "Pantry/Canned",
        "Condiments",
        "Other",
    ];

    /// Step phases
    pub const STEP_PHASES: &[&str] = &["meal-prep", "day-of-eating"];

    /// Kitchen resource types
    pub const RESOURCE_TYPES: &[&str] = &["oven", "pan", "pot", "stove"];

    /// Days of the week accepted by meal plan slots
    pub const DAYS_OF_WEEK: &[&str] = &[
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ];

    /// Meal types accepted by meal plan slots
    pub const MEAL_TYPES: &[&str] = &["lunch", "dinner"];
}
