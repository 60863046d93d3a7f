//! Server configuration derived from environment variables

use std::path::PathBuf;

use crate::limits::OperationLimits;

/// Directory (relative to the working directory) holding persisted compose files
pub const COMPOSE_DIR_NAME: &str = "docker_compose_files";

pub const DOCKER_HOST_VAR: &str = "DOCKER_HOST";
pub const DOCKER_CONTEXT_VAR: &str = "DOCKER_CONTEXT";
pub const COMPOSE_DIR_VAR: &str = "DOCKER_MCP_COMPOSE_DIR";

/// How the `docker` CLI reaches the engine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineConnection {
    /// Explicit daemon address, e.g. `unix:///var/run/docker.sock`
    Host(String),
    /// Named docker context
    Context(String),
    /// Whatever the CLI resolves by default
    #[default]
    Local,
}

impl EngineConnection {
    /// `DOCKER_HOST` wins over `DOCKER_CONTEXT`; empty values are ignored
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = non_empty(DOCKER_HOST_VAR) {
            EngineConnection::Host(host)
        } else if let Some(context) = non_empty(DOCKER_CONTEXT_VAR) {
            EngineConnection::Context(context)
        } else {
            EngineConnection::Local
        }
    }

    /// Global flags placed before the docker subcommand
    pub fn global_args(&self) -> Vec<String> {
        match self {
            EngineConnection::Host(host) => vec!["--host".to_string(), host.clone()],
            EngineConnection::Context(context) => vec!["--context".to_string(), context.clone()],
            EngineConnection::Local => Vec::new(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            EngineConnection::Host(host) => format!("host {host}"),
            EngineConnection::Context(context) => format!("context {context}"),
            EngineConnection::Local => "local defaults".to_string(),
        }
    }
}

/// Everything the server needs besides the engine implementations
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub connection: EngineConnection,
    /// Working directory for persisted compose files
    pub compose_dir: PathBuf,
    pub limits: OperationLimits,
}

impl ServerConfig {
    pub fn new(connection: EngineConnection, compose_dir: impl Into<PathBuf>) -> Self {
        Self {
            connection,
            compose_dir: compose_dir.into(),
            limits: OperationLimits::default(),
        }
    }

    /// Read the process environment; the compose directory defaults to
    /// `docker_compose_files/` under the current working directory.
    pub fn from_env() -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::from_vars(cwd, |key| std::env::var(key).ok()))
    }

    pub fn from_vars<F>(cwd: impl Into<PathBuf>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cwd = cwd.into();
        let compose_dir = match lookup(COMPOSE_DIR_VAR).filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => cwd.join(dir),
            None => cwd.join(COMPOSE_DIR_NAME),
        };

        Self::new(EngineConnection::from_vars(lookup), compose_dir)
    }

    /// Builder: replace the limits
    pub fn with_limits(mut self, limits: OperationLimits) -> Self {
        self.limits = limits;
        self
    }
}
