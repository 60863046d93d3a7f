//! MCP Server binary entry point
//!
//! Run with: cargo run --bin docker-mcp

use std::sync::Arc;

use docker_mcp::mcp::DockerMcpService;
use docker_mcp::{DockerCli, DockerComposeCli, DockerHandlers, ServerConfig};
use rmcp::{transport::stdio, ServiceExt};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging to stderr (stdout is for MCP protocol)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Docker MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env()?;
    info!(
        engine = %config.connection.describe(),
        compose_dir = %config.compose_dir.display(),
        "configuration loaded"
    );

    let engine = Arc::new(DockerCli::new(config.connection.clone()));
    let compose = Arc::new(DockerComposeCli::new(config.connection.clone()));
    let handlers = DockerHandlers::new(engine, compose, &config);

    // Create the service and serve via stdio
    let service = DockerMcpService::new(handlers).serve(stdio()).await?;

    info!("MCP server running, waiting for requests...");

    // Wait for shutdown
    service.waiting().await?;

    info!("MCP server shutting down");
    Ok(())
}
