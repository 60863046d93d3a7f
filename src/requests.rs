//! Typed tool arguments
//!
//! Every struct rejects unknown fields, so a misspelled argument fails at
//! deserialization instead of being silently ignored.

use std::collections::BTreeMap;

use rmcp::schemars;
use serde::{Deserialize, Serialize};

use crate::engine::RunSpec;
use crate::ports::{parse_port_mapping, ContainerPort};
use crate::types::DockerMcpError;

/// Values passed to `docker` as positional arguments must not parse as flags
fn reject_flag_like(field: &str, value: &str) -> Result<(), DockerMcpError> {
    if value.trim_start().starts_with('-') {
        return Err(DockerMcpError::InvalidArgument(format!(
            "{field} must not start with '-': {value}"
        )));
    }
    Ok(())
}

/// Arguments for `create-container`
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateContainerRequest {
    /// Image to run, pulled first when missing locally
    #[schemars(description = "Image to run, e.g. nginx:latest")]
    pub image: String,
    /// Optional container name
    #[serde(default)]
    #[schemars(description = "Optional container name")]
    pub name: Option<String>,
    /// Host port (optionally `<port>/udp`) to container port (optionally `<port>/udp`)
    #[serde(default)]
    #[schemars(description = "Mapping of host port to container port, e.g. {\"8080\": 80}; append /udp for UDP")]
    pub ports: BTreeMap<String, ContainerPort>,
    /// Environment variables
    #[serde(default)]
    #[schemars(description = "Environment variables for the container")]
    pub environment: BTreeMap<String, String>,
}

impl CreateContainerRequest {
    /// Validate the request and turn it into engine run arguments
    pub fn to_run_spec(&self) -> Result<RunSpec, DockerMcpError> {
        if self.image.trim().is_empty() {
            return Err(DockerMcpError::InvalidArgument(
                "Image name cannot be empty".to_string(),
            ));
        }
        reject_flag_like("image", &self.image)?;
        if let Some(name) = &self.name {
            reject_flag_like("name", name)?;
        }

        let ports = self
            .ports
            .iter()
            .map(|(host_key, container_port)| parse_port_mapping(host_key, container_port))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RunSpec {
            image: self.image.clone(),
            name: self.name.clone().filter(|name| !name.trim().is_empty()),
            ports,
            environment: self.environment.clone(),
        })
    }
}

/// Arguments for `deploy-compose`
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeployComposeRequest {
    /// Compose file contents
    #[schemars(description = "Docker Compose YAML content")]
    pub compose_yaml: String,
    /// Compose project name
    #[schemars(description = "Name for the compose project")]
    pub project_name: String,
}

impl DeployComposeRequest {
    pub fn validate(&self) -> Result<(), DockerMcpError> {
        if self.compose_yaml.trim().is_empty() || self.project_name.trim().is_empty() {
            return Err(DockerMcpError::InvalidArgument(
                "Missing required compose_yaml or project_name".to_string(),
            ));
        }
        reject_flag_like("project_name", &self.project_name)
    }
}

/// Arguments for the tools addressing one container
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ContainerNameRequest {
    /// Container name or ID
    #[schemars(description = "Name or ID of the container")]
    pub container_name: String,
}

impl ContainerNameRequest {
    pub fn validate(&self) -> Result<(), DockerMcpError> {
        if self.container_name.trim().is_empty() {
            return Err(DockerMcpError::InvalidArgument(
                "Missing required container_name".to_string(),
            ));
        }
        reject_flag_like("container_name", &self.container_name)
    }
}
