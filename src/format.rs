//! Human-readable rendering of engine results

use crate::engine::{ContainerDetails, ContainerStats, ContainerSummary};
use crate::types::DebugTrace;

const NOT_AVAILABLE: &str = "N/A";

fn or_na(value: &str) -> &str {
    if value.is_empty() { NOT_AVAILABLE } else { value }
}

/// Append the `Debug Info` section used by every successful tool response
pub fn with_debug_info(body: &str, trace: &DebugTrace) -> String {
    format!("{body}\n\nDebug Info:\n{trace}")
}

/// Prefix an error with its context and append the `Debug Information` section
pub fn error_with_trace(context: &str, error: impl std::fmt::Display, trace: &DebugTrace) -> String {
    format!("{context}: {error}\n\nDebug Information:\n{trace}")
}

/// One `<short id> - <name> - <state>` line per container
pub fn format_container_list(containers: &[ContainerSummary]) -> String {
    let mut out = String::from("All Docker Containers:\n");
    if containers.is_empty() {
        out.push_str("No containers found");
        return out;
    }

    let lines: Vec<String> = containers
        .iter()
        .map(|c| {
            let short_id: String = c.id.chars().take(12).collect();
            format!("{} - {} - {}", short_id, c.name, c.state)
        })
        .collect();
    out.push_str(&lines.join("\n"));
    out
}

/// Multi-section description of an inspected container
pub fn format_container_info(container: &ContainerDetails) -> String {
    let mut lines = vec![
        "=== Container Information ===".to_string(),
        format!("Name: {}", container.display_name()),
        format!("ID: {}", container.id),
        format!("Status: {}", container.state.status),
        format!("Image: {}", container.config.image),
        format!("Created: {}", container.created),
        format!(
            "Started: {}",
            or_na(container.state.started_at.as_deref().unwrap_or_default())
        ),
        String::new(),
        "=== Environment Variables ===".to_string(),
    ];

    match container.config.env.as_deref() {
        Some(env) if !env.is_empty() => lines.extend(env.iter().map(|var| format!("  {var}"))),
        _ => lines.push("  No environment variables set".to_string()),
    }

    lines.push(String::new());
    lines.push("=== Port Mappings ===".to_string());
    match &container.network_settings.ports {
        Some(ports) if !ports.is_empty() => {
            for (container_port, bindings) in ports {
                match bindings.as_deref() {
                    Some(bindings) if !bindings.is_empty() => {
                        for binding in bindings {
                            let host_ip = if binding.host_ip.is_empty() {
                                "0.0.0.0"
                            } else {
                                binding.host_ip.as_str()
                            };
                            lines.push(format!(
                                "  {}:{} -> {}",
                                host_ip, binding.host_port, container_port
                            ));
                        }
                    }
                    _ => lines.push(format!("  {container_port} (not bound to host)")),
                }
            }
        }
        _ => lines.push("  No port mappings".to_string()),
    }

    lines.push(String::new());
    lines.push("=== Volume Mounts ===".to_string());
    if container.mounts.is_empty() {
        lines.push("  No volume mounts".to_string());
    } else {
        for mount in &container.mounts {
            lines.push(format!(
                "  {}: {} -> {} ({})",
                if mount.kind.is_empty() { "unknown" } else { mount.kind.as_str() },
                or_na(&mount.source),
                or_na(&mount.destination),
                or_na(&mount.mode)
            ));
        }
    }

    lines.push(String::new());
    lines.push("=== Network Settings ===".to_string());
    match &container.network_settings.networks {
        Some(networks) if !networks.is_empty() => {
            for (name, endpoint) in networks {
                lines.push(format!(
                    "  Network: {} (IP: {})",
                    name,
                    or_na(&endpoint.ip_address)
                ));
            }
        }
        _ => lines.push("  No network information available".to_string()),
    }

    lines.push(String::new());
    lines.push("=== Resource Limits ===".to_string());
    if container.host_config.memory > 0 {
        let megabytes = container.host_config.memory as f64 / (1024.0 * 1024.0);
        lines.push(format!("  Memory Limit: {megabytes:.0}MB"));
    } else {
        lines.push("  Memory Limit: Not set".to_string());
    }
    if container.host_config.cpu_shares > 0 {
        lines.push(format!("  CPU Shares: {}", container.host_config.cpu_shares));
    } else {
        lines.push("  CPU Shares: Not set".to_string());
    }

    lines.push(String::new());
    lines.push("=== Working Directory & Command ===".to_string());
    lines.push(format!(
        "  Working Dir: {}",
        or_na(&container.config.working_dir)
    ));
    match container.config.cmd.as_deref() {
        Some(cmd) if !cmd.is_empty() => lines.push(format!("  Command: {}", cmd.join(" "))),
        _ => lines.push(format!("  Command: {NOT_AVAILABLE}")),
    }

    lines.join("\n")
}

/// One-shot resource usage snapshot
pub fn format_container_stats(stats: &ContainerStats) -> String {
    let mut lines = vec![
        "=== Container Stats ===".to_string(),
        format!("Name: {}", or_na(&stats.name)),
    ];
    if !stats.id.is_empty() {
        let short_id: String = stats.id.chars().take(12).collect();
        lines.push(format!("ID: {short_id}"));
    }
    lines.push(format!("CPU: {}", or_na(&stats.cpu_percent)));
    lines.push(format!(
        "Memory: {} ({})",
        or_na(&stats.memory_usage),
        or_na(&stats.memory_percent)
    ));
    lines.push(format!("Network I/O: {}", or_na(&stats.network_io)));
    lines.push(format!("Block I/O: {}", or_na(&stats.block_io)));
    lines.push(format!("PIDs: {}", or_na(&stats.pids)));
    lines.join("\n")
}
