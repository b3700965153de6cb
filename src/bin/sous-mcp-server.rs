// ABOUTME: Server binary: configuration, logging, database, and HTTP serving
// ABOUTME: Boots the meal-prep API with MCP and chat orchestration surfaces
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sous Kitchen Intelligence

//! # Sous MCP Server Binary
//!
//! Loads environment configuration, initializes logging, opens and
//! migrates the SQLite store, constructs the configured LLM provider,
//! and serves the HTTP surface.

use anyhow::Result;
use clap::Parser;
use sous_mcp_server::{
    config::ServerConfig,
    database::Database,
    llm,
    logging,
    mcp::resources::ServerResources,
    routes,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "sous-mcp-server")]
#[command(about = "Sous - meal prep data API for LLMs")]
struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    info!("Starting Sous MCP Server");
    info!("{}", config.summary());

    let database = Database::new(&config.database_url).await?;

    // A usable upstream credential is a startup requirement
    let provider = llm::provider_from_config(&config.llm)?;
    info!(provider = provider.name(), model = provider.model(), "LLM provider ready");

    let http_port = config.http_port;
    let resources = Arc::new(ServerResources::new(database, provider, config));
    let app = routes::router(resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", http_port)).await?;
    info!("Server running on port {http_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown signal handler");
    }
}
