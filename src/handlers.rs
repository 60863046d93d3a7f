//! Tool handlers: validate a typed request, run engine work off the async
//! runtime under a timeout, and render the result as text

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::compose::ComposeBackend;
use crate::config::ServerConfig;
use crate::deploy::ComposeDeployer;
use crate::engine::ContainerEngine;
use crate::format::{
    error_with_trace, format_container_info, format_container_list, format_container_stats,
    with_debug_info,
};
use crate::limits::{timeout_secs, OperationLimits};
use crate::requests::{ContainerNameRequest, CreateContainerRequest, DeployComposeRequest};
use crate::types::{DebugTrace, DockerMcpError, ToolOutput};

/// Run blocking engine work on the blocking pool, bounded by `timeout`.
///
/// On timeout the work keeps running to completion in the background; only the
/// caller stops waiting.
pub async fn run_blocking<T, F>(timeout: Duration, work: F) -> Result<T, DockerMcpError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DockerMcpError> + Send + 'static,
{
    run_blocking_until(Instant::now() + timeout, timeout, work).await
}

/// [`run_blocking`] against an absolute deadline. `limit` is the configured
/// bound reported in the timeout error.
pub async fn run_blocking_until<T, F>(
    deadline: Instant,
    limit: Duration,
    work: F,
) -> Result<T, DockerMcpError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DockerMcpError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout_at(deadline, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(DockerMcpError::engine("worker task", join_error)),
        Err(_) => Err(DockerMcpError::Timeout(timeout_secs(limit.as_millis() as u64))),
    }
}

// ============================================================================
// Project locks
// ============================================================================

/// One async lock per compose project, dropped from the map once unused
#[derive(Clone, Default)]
struct ProjectLocks {
    locks: Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ProjectLocks {
    /// Wait for exclusive use of `project_name`, giving up at `deadline`
    async fn acquire(&self, project_name: &str, deadline: Instant) -> Option<ProjectLease> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(project_name.to_string()).or_default())
        };

        match tokio::time::timeout_at(deadline, lock.lock_owned()).await {
            Ok(guard) => Some(ProjectLease {
                guard: Some(guard),
                locks: self.clone(),
                project_name: project_name.to_string(),
            }),
            Err(_) => {
                self.prune(project_name);
                None
            }
        }
    }

    /// Forget the project's lock if the map holds the only reference
    fn prune(&self, project_name: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(project_name)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(project_name);
        }
    }

    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive use of one project until dropped
struct ProjectLease {
    guard: Option<OwnedMutexGuard<()>>,
    locks: ProjectLocks,
    project_name: String,
}

impl Drop for ProjectLease {
    fn drop(&mut self) {
        // the guard holds a reference to the lock; release it before pruning
        self.guard.take();
        self.locks.prune(&self.project_name);
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Handlers behind every Docker tool
#[derive(Clone)]
pub struct DockerHandlers {
    engine: Arc<dyn ContainerEngine>,
    deployer: Arc<ComposeDeployer>,
    limits: OperationLimits,
    /// Serializes deployments that share a compose file path
    project_locks: ProjectLocks,
}

impl DockerHandlers {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        compose: Arc<dyn ComposeBackend>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            engine,
            deployer: Arc::new(ComposeDeployer::new(compose, config.compose_dir.clone())),
            limits: config.limits.clone(),
            project_locks: ProjectLocks::default(),
        }
    }

    pub fn limits(&self) -> &OperationLimits {
        &self.limits
    }

    /// Projects with a deployment running or waiting
    pub fn active_projects(&self) -> usize {
        self.project_locks.len()
    }

    /// Pull the image if needed and start a detached container
    pub async fn create_container(&self, request: CreateContainerRequest) -> ToolOutput {
        let spec = match request.to_run_spec() {
            Ok(spec) => spec,
            Err(e) => {
                return ToolOutput::error(format!(
                    "Error creating container: {e} | Arguments: {request:?}"
                ));
            }
        };

        let engine = Arc::clone(&self.engine);
        let result = run_blocking(self.limits.create_timeout(), move || {
            if !engine.image_exists(&spec.image)? {
                info!(image = %spec.image, "pulling image");
                engine.pull(&spec.image)?;
            }
            engine.run(&spec)
        })
        .await;

        match result {
            Ok(handle) => {
                info!(container = %handle.name, id = %handle.id, "created container");
                ToolOutput::ok(format!(
                    "Created container '{}' (ID: {})",
                    handle.name, handle.id
                ))
            }
            Err(e @ DockerMcpError::Timeout(_)) => {
                warn!(image = %request.image, "container creation timed out");
                ToolOutput::error(e.to_string())
            }
            Err(e) => {
                warn!(image = %request.image, error = %e, "container creation failed");
                ToolOutput::error(format!(
                    "Error creating container: {e} | Arguments: {request:?}"
                ))
            }
        }
    }

    /// Deploy a compose stack; see [`ComposeDeployer::deploy`]
    pub async fn deploy_compose(&self, request: DeployComposeRequest) -> ToolOutput {
        const CONTEXT: &str = "Error deploying compose stack";
        let trace = DebugTrace::new();

        if let Err(e) = request.validate() {
            return ToolOutput::error(error_with_trace(CONTEXT, e, &trace));
        }

        // waiting for an earlier deployment of the project counts against the deadline
        let deadline = Instant::now() + self.limits.deploy_timeout();
        let Some(lease) = self
            .project_locks
            .acquire(&request.project_name, deadline)
            .await
        else {
            warn!(project = %request.project_name, "timed out waiting for an earlier deployment");
            trace.push(format!(
                "Timed out waiting for an earlier deployment of '{}'",
                request.project_name
            ));
            let e = DockerMcpError::Timeout(timeout_secs(self.limits.deploy_timeout_ms));
            return ToolOutput::error(error_with_trace(CONTEXT, e, &trace));
        };

        // held by the blocking task until cleanup has finished, even past a timeout
        let deployer = Arc::clone(&self.deployer);
        let task_trace = trace.clone();
        let result = run_blocking_until(deadline, self.limits.deploy_timeout(), move || {
            let _lease = lease;
            Ok(deployer.deploy(&request.compose_yaml, &request.project_name, task_trace))
        })
        .await;

        match result {
            Ok(Ok(report)) => ToolOutput::ok(report.to_string()),
            Ok(Err(failure)) => ToolOutput::error(format!("{CONTEXT}: {failure}")),
            Err(e) => {
                warn!(error = %e, "compose deployment did not complete");
                ToolOutput::error(error_with_trace(CONTEXT, e, &trace))
            }
        }
    }

    /// Fetch the tail of a container's logs
    pub async fn get_logs(&self, request: ContainerNameRequest) -> ToolOutput {
        const CONTEXT: &str = "Error retrieving logs";
        let trace = DebugTrace::new();

        if let Err(e) = request.validate() {
            return ToolOutput::error(error_with_trace(CONTEXT, e, &trace));
        }

        let name = request.container_name;
        trace.push(format!("Fetching logs for container '{name}'"));

        let engine = Arc::clone(&self.engine);
        let tail = self.limits.log_tail;
        let lookup = name.clone();
        match run_blocking(self.limits.query_timeout(), move || engine.logs(&lookup, tail)).await {
            Ok(logs) => ToolOutput::ok(with_debug_info(
                &format!("Logs for container '{name}':\n{logs}"),
                &trace,
            )),
            Err(e) => ToolOutput::error(error_with_trace(CONTEXT, e, &trace)),
        }
    }

    /// List all containers, stopped ones included
    pub async fn list_containers(&self) -> ToolOutput {
        let trace = DebugTrace::new();
        trace.push("Listing all Docker containers");

        let engine = Arc::clone(&self.engine);
        match run_blocking(self.limits.query_timeout(), move || engine.list(true)).await {
            Ok(containers) => {
                trace.push(format!("Found {} containers", containers.len()));
                ToolOutput::ok(with_debug_info(&format_container_list(&containers), &trace))
            }
            Err(e) => ToolOutput::error(error_with_trace("Error listing containers", e, &trace)),
        }
    }

    /// Detailed description of one container
    pub async fn get_container_info(&self, request: ContainerNameRequest) -> ToolOutput {
        const CONTEXT: &str = "Error getting container info";
        let trace = DebugTrace::new();

        if let Err(e) = request.validate() {
            return ToolOutput::error(error_with_trace(CONTEXT, e, &trace));
        }

        let name = request.container_name;
        trace.push(format!("Getting detailed info for container '{name}'"));

        let engine = Arc::clone(&self.engine);
        match run_blocking(self.limits.query_timeout(), move || engine.inspect(&name)).await {
            Ok(details) => ToolOutput::ok(with_debug_info(&format_container_info(&details), &trace)),
            Err(e) => ToolOutput::error(error_with_trace(CONTEXT, e, &trace)),
        }
    }

    /// One-shot resource usage of one container
    pub async fn get_container_stats(&self, request: ContainerNameRequest) -> ToolOutput {
        const CONTEXT: &str = "Error getting container stats";
        let trace = DebugTrace::new();

        if let Err(e) = request.validate() {
            return ToolOutput::error(error_with_trace(CONTEXT, e, &trace));
        }

        let name = request.container_name;
        trace.push(format!("Collecting stats for container '{name}'"));

        let engine = Arc::clone(&self.engine);
        match run_blocking(self.limits.query_timeout(), move || engine.stats(&name)).await {
            Ok(stats) => ToolOutput::ok(with_debug_info(&format_container_stats(&stats), &trace)),
            Err(e) => ToolOutput::error(error_with_trace(CONTEXT, e, &trace)),
        }
    }
}
