//! Container engine client: the trait the handlers call and its `docker` CLI implementation

use std::collections::BTreeMap;
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConnection;
use crate::ports::PortMapping;
use crate::types::{CommandOutput, DockerMcpError};

// ============================================================================
// Engine models
// ============================================================================

/// Arguments for starting a detached container
#[derive(Debug, Clone, Default)]
pub struct RunSpec {
    pub image: String,
    pub name: Option<String>,
    pub ports: Vec<PortMapping>,
    pub environment: BTreeMap<String, String>,
}

/// Identity of a freshly started container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

/// One row of `docker ps --format '{{json .}}'`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Names")]
    pub name: String,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Status", default)]
    pub status: String,
}

/// Subset of `docker container inspect` output used for formatting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub created: String,
    pub state: ContainerState,
    pub config: ContainerConfig,
    pub host_config: HostConfig,
    pub mounts: Vec<MountPoint>,
    pub network_settings: NetworkSettings,
}

impl ContainerDetails {
    /// Name without the leading `/` the engine adds
    pub fn display_name(&self) -> &str {
        self.name.trim_start_matches('/')
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerState {
    pub status: String,
    pub started_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerConfig {
    pub image: String,
    pub env: Option<Vec<String>>,
    pub cmd: Option<Vec<String>>,
    pub working_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostConfig {
    /// Memory limit in bytes, 0 when unlimited
    pub memory: i64,
    pub cpu_shares: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MountPoint {
    #[serde(rename = "Type")]
    pub kind: String,
    pub source: String,
    pub destination: String,
    pub mode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NetworkSettings {
    /// `"80/tcp" -> bindings`, `None` for exposed but unpublished ports
    pub ports: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
    pub networks: Option<BTreeMap<String, EndpointSettings>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    #[serde(rename = "IPAddress")]
    pub ip_address: String,
}

/// One row of `docker stats --no-stream --format '{{json .}}'`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerStats {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "CPUPerc")]
    pub cpu_percent: String,
    #[serde(rename = "MemUsage")]
    pub memory_usage: String,
    #[serde(rename = "MemPerc")]
    pub memory_percent: String,
    #[serde(rename = "NetIO")]
    pub network_io: String,
    #[serde(rename = "BlockIO")]
    pub block_io: String,
    #[serde(rename = "PIDs")]
    pub pids: String,
}

// ============================================================================
// Engine trait
// ============================================================================

/// Blocking container engine operations used by the tool handlers
pub trait ContainerEngine: Send + Sync {
    fn image_exists(&self, image: &str) -> Result<bool, DockerMcpError>;
    fn pull(&self, image: &str) -> Result<(), DockerMcpError>;
    fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, DockerMcpError>;
    fn list(&self, all: bool) -> Result<Vec<ContainerSummary>, DockerMcpError>;
    fn inspect(&self, name: &str) -> Result<ContainerDetails, DockerMcpError>;
    fn logs(&self, name: &str, tail: u32) -> Result<String, DockerMcpError>;
    fn stats(&self, name: &str) -> Result<ContainerStats, DockerMcpError>;
}

// ============================================================================
// docker CLI
// ============================================================================

/// Run `docker <global args> <args>` and capture its output.
///
/// Only a failure to spawn the process is an error; exit status is reported.
pub fn run_docker(
    connection: &EngineConnection,
    args: &[String],
) -> Result<CommandOutput, std::io::Error> {
    let mut cmd = Command::new("docker");
    cmd.args(connection.global_args()).args(args);
    debug!(?args, "running docker");

    let output = cmd.output()?;
    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Engine client backed by the `docker` executable
#[derive(Debug, Clone, Default)]
pub struct DockerCli {
    connection: EngineConnection,
}

impl DockerCli {
    pub fn new(connection: EngineConnection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &EngineConnection {
        &self.connection
    }

    /// Run a command that must exit zero, returning its output
    fn checked(&self, operation: &str, args: &[&str]) -> Result<CommandOutput, DockerMcpError> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        self.checked_owned(operation, &args)
    }

    fn checked_owned(
        &self,
        operation: &str,
        args: &[String],
    ) -> Result<CommandOutput, DockerMcpError> {
        let output = run_docker(&self.connection, args)
            .map_err(|e| DockerMcpError::engine(operation, format!("failed to run docker: {e}")))?;
        if output.success() {
            Ok(output)
        } else {
            Err(DockerMcpError::engine(
                operation,
                format!(
                    "exit code {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            ))
        }
    }

    /// Build the argument list for `docker run`
    pub fn run_args(spec: &RunSpec) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--detach".to_string()];
        if let Some(name) = &spec.name {
            args.push("--name".to_string());
            args.push(name.clone());
        }
        for mapping in &spec.ports {
            args.push("--publish".to_string());
            args.push(mapping.publish_arg());
        }
        for (key, value) in &spec.environment {
            args.push("--env".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.clone());
        args
    }
}

/// Parse newline-delimited JSON objects
fn parse_json_lines<T: for<'de> Deserialize<'de>>(
    what: &str,
    stdout: &str,
) -> Result<Vec<T>, DockerMcpError> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| DockerMcpError::decode(what, e)))
        .collect()
}

impl ContainerEngine for DockerCli {
    fn image_exists(&self, image: &str) -> Result<bool, DockerMcpError> {
        let args = vec!["image".to_string(), "inspect".to_string(), image.to_string()];
        let output = run_docker(&self.connection, &args)
            .map_err(|e| DockerMcpError::engine("image inspect", e))?;
        Ok(output.success())
    }

    fn pull(&self, image: &str) -> Result<(), DockerMcpError> {
        self.checked("pull", &["pull", image])?;
        Ok(())
    }

    fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, DockerMcpError> {
        let output = self.checked_owned("run", &Self::run_args(spec))?;
        let id = output.stdout.trim().to_string();

        let name = match &spec.name {
            Some(name) => name.clone(),
            None => {
                let inspected =
                    self.checked("inspect", &["container", "inspect", "--format", "{{.Name}}", id.as_str()])?;
                inspected.stdout.trim().trim_start_matches('/').to_string()
            }
        };

        Ok(ContainerHandle { id, name })
    }

    fn list(&self, all: bool) -> Result<Vec<ContainerSummary>, DockerMcpError> {
        let mut args = vec!["ps", "--no-trunc", "--format", "{{json .}}"];
        if all {
            args.push("--all");
        }
        let output = self.checked("ps", &args)?;
        parse_json_lines("container list", &output.stdout)
    }

    fn inspect(&self, name: &str) -> Result<ContainerDetails, DockerMcpError> {
        let output = self.checked("inspect", &["container", "inspect", name])?;
        let mut details: Vec<ContainerDetails> = serde_json::from_str(&output.stdout)
            .map_err(|e| DockerMcpError::decode("container inspect", e))?;
        if details.is_empty() {
            return Err(DockerMcpError::engine(
                "inspect",
                format!("no such container: {name}"),
            ));
        }
        Ok(details.swap_remove(0))
    }

    fn logs(&self, name: &str, tail: u32) -> Result<String, DockerMcpError> {
        let tail = tail.to_string();
        let output = self.checked("logs", &["logs", "--tail", tail.as_str(), name])?;
        // container stderr is forwarded on the CLI's stderr
        let mut logs = output.stdout;
        if !output.stderr.is_empty() {
            if !logs.is_empty() && !logs.ends_with('\n') {
                logs.push('\n');
            }
            logs.push_str(&output.stderr);
        }
        Ok(logs)
    }

    fn stats(&self, name: &str) -> Result<ContainerStats, DockerMcpError> {
        let output = self.checked("stats", &["stats", "--no-stream", "--format", "{{json .}}", name])?;
        parse_json_lines::<ContainerStats>("container stats", &output.stdout)?
            .into_iter()
            .next()
            .ok_or_else(|| DockerMcpError::engine("stats", format!("no stats for container: {name}")))
    }
}
