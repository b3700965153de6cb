// ABOUTME: Configuration management module for deployment-specific settings
// ABOUTME: Re-exports the environment-based ServerConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! Configuration management

pub mod environment;

pub use environment::{LlmConfig, ServerConfig};
