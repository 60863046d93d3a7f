//! Port mapping parsing for `create-container`
//!
//! A host key of the form `<port>/udp` or a container port of the form
//! `<port>/udp` selects UDP; anything else publishes TCP.

use std::fmt;

use rmcp::schemars;
use serde::{Deserialize, Serialize};

use crate::types::DockerMcpError;

/// Container side of a port mapping, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum ContainerPort {
    Number(u16),
    Text(String),
}

impl fmt::Display for ContainerPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerPort::Number(port) => write!(f, "{port}"),
            ContainerPort::Text(port) => f.write_str(port),
        }
    }
}

impl From<u16> for ContainerPort {
    fn from(port: u16) -> Self {
        ContainerPort::Number(port)
    }
}

impl From<&str> for ContainerPort {
    fn from(port: &str) -> Self {
        ContainerPort::Text(port.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    /// Only `udp` (any case) selects UDP
    fn from_suffix(suffix: &str) -> Self {
        if suffix.eq_ignore_ascii_case("udp") {
            Protocol::Udp
        } else {
            Protocol::Tcp
        }
    }
}

/// A parsed `host -> container` port publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host_port: String,
    pub container_port: String,
    pub protocol: Protocol,
}

impl PortMapping {
    /// `(host, container)` for TCP or `(host, container, "udp")` for UDP
    pub fn parts(&self) -> Vec<&str> {
        match self.protocol {
            Protocol::Tcp => vec![self.host_port.as_str(), self.container_port.as_str()],
            Protocol::Udp => vec![self.host_port.as_str(), self.container_port.as_str(), "udp"],
        }
    }

    /// Value for `docker run --publish`
    pub fn publish_arg(&self) -> String {
        match self.protocol {
            Protocol::Tcp => format!("{}:{}", self.host_port, self.container_port),
            Protocol::Udp => format!("{}:{}/udp", self.host_port, self.container_port),
        }
    }
}

fn split_protocol<'a>(value: &'a str, side: &str) -> Result<(&'a str, &'a str), DockerMcpError> {
    match value.split_once('/') {
        Some((port, protocol)) if !protocol.contains('/') => Ok((port, protocol)),
        _ => Err(DockerMcpError::InvalidArgument(format!(
            "malformed {side} port specifier '{value}'"
        ))),
    }
}

/// Parse one entry of the `ports` argument.
///
/// When the host key carries a protocol the container port is used verbatim.
pub fn parse_port_mapping(
    host_key: &str,
    container_port: &ContainerPort,
) -> Result<PortMapping, DockerMcpError> {
    if host_key.contains('/') {
        let (host_port, protocol) = split_protocol(host_key, "host")?;
        return Ok(PortMapping {
            host_port: host_port.to_string(),
            container_port: container_port.to_string(),
            protocol: Protocol::from_suffix(protocol),
        });
    }

    if let ContainerPort::Text(text) = container_port {
        if text.contains('/') {
            let (port, protocol) = split_protocol(text, "container")?;
            return Ok(PortMapping {
                host_port: host_key.to_string(),
                container_port: port.to_string(),
                protocol: Protocol::from_suffix(protocol),
            });
        }
    }

    Ok(PortMapping {
        host_port: host_key.to_string(),
        container_port: container_port.to_string(),
        protocol: Protocol::Tcp,
    })
}
