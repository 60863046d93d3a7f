//! Docker MCP - Docker container and compose-stack tools for AI agents
//!
//! Translates structured tool calls into Docker engine operations and renders
//! the results as human-readable text. Tools are served over the Model Context
//! Protocol by the `docker-mcp` binary.
//!
//! ## Tools
//!
//! - **`create-container`** - pull (if missing) and run a detached container
//! - **`deploy-compose`** - deploy a compose stack from YAML under a project name
//! - **`get-logs`** - tail a container's logs
//! - **`list-containers`** - list all containers
//! - **`get-container-info`** - detailed inspection of one container
//! - **`get-container-stats`** - one-shot resource usage of one container
//!
//! ## Engine connection
//!
//! `DOCKER_HOST` takes precedence, then `DOCKER_CONTEXT`, then the CLI's local
//! defaults.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docker_mcp::{DockerCli, DockerComposeCli, DockerHandlers, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let handlers = DockerHandlers::new(
//!     Arc::new(DockerCli::new(config.connection.clone())),
//!     Arc::new(DockerComposeCli::new(config.connection.clone())),
//!     &config,
//! );
//!
//! let output = handlers.list_containers().await;
//! println!("{}", output.text);
//! ```

pub mod compose;
pub mod config;
pub mod deploy;
pub mod engine;
pub mod format;
pub mod handlers;
pub mod limits;
pub mod mcp;
pub mod ports;
pub mod requests;
pub mod types;

// Re-export core types
pub use compose::{ComposeBackend, ComposeSpec, DockerComposeCli, PersistedComposeFile};
pub use config::{EngineConnection, ServerConfig};
pub use deploy::{ComposeDeployer, DeployFailure, DeployReport};
pub use engine::{
    ContainerDetails, ContainerEngine, ContainerHandle, ContainerStats, ContainerSummary,
    DockerCli, RunSpec,
};
pub use handlers::DockerHandlers;
pub use limits::{
    OperationLimits, DEFAULT_CREATE_TIMEOUT_MS, DEFAULT_DEPLOY_TIMEOUT_MS, DEFAULT_LOG_TAIL,
    DEFAULT_QUERY_TIMEOUT_MS,
};
pub use ports::{parse_port_mapping, ContainerPort, PortMapping, Protocol};
pub use requests::{ContainerNameRequest, CreateContainerRequest, DeployComposeRequest};
pub use types::{CommandOutput, DebugTrace, DockerMcpError, ToolOutput};
