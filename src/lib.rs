// ABOUTME: Main library entry point for the Sous meal prep platform
// ABOUTME: Provides MCP tooling and chat tool-orchestration over a SQLite meal-prep store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

#![deny(unsafe_code)]

//! # Sous MCP Server
//!
//! A Model Context Protocol (MCP) server for meal preparation planning.
//! The server stores recipes, preparation steps, inventory batches, and
//! weekly meal plans in SQLite, and exposes them to language models through
//! two access tiers:
//!
//! - A constrained tool catalogue (`query` plus the `manage_*` family) that
//!   validates every invocation and routes mutations through atomic,
//!   cascade-consistent transactions.
//! - An unrestricted `execute_sql` batch path used by the conversational
//!   chat UI for exploratory access.
//!
//! ## Architecture
//!
//! - **llm**: Provider adapters (Anthropic block-style, OpenAI
//!   function-call-style) normalized into one canonical response shape
//! - **tools**: Tool dispatch, argument validation, and the transactional
//!   mutation engine
//! - **mcp**: MCP protocol handlers, tool schemas, and the live schema
//!   resource
//! - **routes**: HTTP surface (chat orchestration, ad hoc SQL, conversation
//!   records, export, MCP endpoint)
//! - **database**: SQLite pool, in-code migrations, id allocation, and the
//!   conversation record store

/// Configuration management loaded from the environment
pub mod config;

/// Application constants: tool names, protocol versions, enum value sets
pub mod constants;

/// SQLite database management, migrations, and conversation records
pub mod database;

/// Unified error handling with standard error codes and HTTP responses
pub mod errors;

/// Provider adapters for upstream language models
pub mod llm;

/// Logging configuration and structured logging setup
pub mod logging;

/// MCP protocol implementation (schemas, handlers, resources)
pub mod mcp;

/// Domain entity row types
pub mod models;

/// HTTP routes for the REST and MCP surfaces
pub mod routes;

/// SQL statement splitting, classification, and batch execution
pub mod sql;

/// Tool dispatch, validation, and the domain mutation engine
pub mod tools;
