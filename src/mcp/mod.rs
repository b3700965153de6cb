// ABOUTME: MCP protocol implementation module
// ABOUTME: Groups schemas, protocol handlers, and shared server resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # MCP Protocol Implementation
//!
//! JSON-RPC message types, the tool catalogue schema, core protocol
//! handlers (initialize, ping, tools, resources), and the shared server
//! resource container.

pub mod protocol;
pub mod resources;
pub mod schema;
