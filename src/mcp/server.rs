//! MCP Server implementation using the official rmcp SDK
//!
//! Exposes the Docker handlers as tools over the Model Context Protocol.

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};

use crate::handlers::DockerHandlers;
use crate::requests::{ContainerNameRequest, CreateContainerRequest, DeployComposeRequest};
use crate::types::ToolOutput;

impl From<ToolOutput> for CallToolResult {
    fn from(output: ToolOutput) -> Self {
        if output.is_error {
            CallToolResult::error(vec![Content::text(output.text)])
        } else {
            CallToolResult::success(vec![Content::text(output.text)])
        }
    }
}

// ============================================================================
// MCP Service
// ============================================================================

/// Docker MCP Service
///
/// Tool failures are reported as error results, never as protocol errors.
#[derive(Clone)]
pub struct DockerMcpService {
    handlers: DockerHandlers,
    /// Tool router for rmcp
    tool_router: ToolRouter<Self>,
}

impl DockerMcpService {
    pub fn new(handlers: DockerHandlers) -> Self {
        Self {
            handlers,
            tool_router: Self::tool_router(),
        }
    }

    pub fn handlers(&self) -> &DockerHandlers {
        &self.handlers
    }
}

#[tool_router]
impl DockerMcpService {
    #[tool(
        name = "create-container",
        description = "Create and start a Docker container, pulling the image if needed"
    )]
    async fn create_container(
        &self,
        Parameters(params): Parameters<CreateContainerRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.handlers.create_container(params).await.into())
    }

    /// Deploy a compose stack
    ///
    /// Runs down, up -d and ps against a temporary compose file that is removed afterwards.
    #[tool(
        name = "deploy-compose",
        description = "Deploy a Docker Compose stack from YAML under a project name"
    )]
    async fn deploy_compose(
        &self,
        Parameters(params): Parameters<DeployComposeRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.handlers.deploy_compose(params).await.into())
    }

    #[tool(
        name = "get-logs",
        description = "Get the latest logs of a Docker container"
    )]
    async fn get_logs(
        &self,
        Parameters(params): Parameters<ContainerNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.handlers.get_logs(params).await.into())
    }

    #[tool(
        name = "list-containers",
        description = "List all Docker containers, including stopped ones"
    )]
    async fn list_containers(&self) -> Result<CallToolResult, McpError> {
        Ok(self.handlers.list_containers().await.into())
    }

    #[tool(
        name = "get-container-info",
        description = "Get detailed information about a Docker container: environment, ports, mounts, networks and limits"
    )]
    async fn get_container_info(
        &self,
        Parameters(params): Parameters<ContainerNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.handlers.get_container_info(params).await.into())
    }

    #[tool(
        name = "get-container-stats",
        description = "Get a one-shot CPU, memory, network and block I/O snapshot of a Docker container"
    )]
    async fn get_container_stats(
        &self,
        Parameters(params): Parameters<ContainerNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.handlers.get_container_stats(params).await.into())
    }
}

#[tool_handler]
impl ServerHandler for DockerMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "docker-mcp".to_string(),
                title: Some("Docker MCP".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Docker MCP Server - Create containers, deploy compose stacks, and inspect containers"
                    .to_string(),
            ),
        }
    }
}
