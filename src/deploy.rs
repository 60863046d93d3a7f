//! Compose stack deployment: persist, down, up, ps, clean up
//!
//! The persisted compose file lives in a [`PersistedComposeFile`] guard for the
//! whole down/up/ps sequence, so it is removed on every exit path, after the
//! last compose command has run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::compose::{ComposeBackend, ComposeSpec, PersistedComposeFile};
use crate::types::{CommandOutput, DebugTrace, DockerMcpError};

/// Placeholder used when `ps` cannot list the services
pub const SERVICES_UNAVAILABLE: &str = "Unable to list services";

/// Successful deployment
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub project_name: String,
    /// Output of `ps`, or [`SERVICES_UNAVAILABLE`]
    pub services: String,
    pub trace: DebugTrace,
}

impl fmt::Display for DeployReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully deployed compose stack '{}'\nRunning services:\n{}\n\nDebug Info:\n{}",
            self.project_name, self.services, self.trace
        )
    }
}

/// Failed deployment, always carrying the trace gathered up to the failure
#[derive(Debug)]
pub struct DeployFailure {
    pub error: DockerMcpError,
    pub trace: DebugTrace,
}

impl DeployFailure {
    pub fn new(error: DockerMcpError, trace: DebugTrace) -> Self {
        Self { error, trace }
    }
}

impl fmt::Display for DeployFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\nDebug Information:\n{}", self.error, self.trace)
    }
}

impl std::error::Error for DeployFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// How one compose step ended
#[derive(Debug)]
enum StepOutcome {
    /// Ran and exited zero
    Succeeded(CommandOutput),
    /// Ran and exited non-zero
    Exited(CommandOutput),
    /// Could not be run
    Failed(DockerMcpError),
}

impl From<Result<CommandOutput, DockerMcpError>> for StepOutcome {
    fn from(result: Result<CommandOutput, DockerMcpError>) -> Self {
        match result {
            Ok(output) if output.success() => StepOutcome::Succeeded(output),
            Ok(output) => StepOutcome::Exited(output),
            Err(e) => StepOutcome::Failed(e),
        }
    }
}

/// Project names become file names, so they must be a single path component
pub fn validate_project_name(project_name: &str) -> Result<(), DockerMcpError> {
    if project_name.trim().is_empty() {
        return Err(DockerMcpError::InvalidArgument(
            "project_name cannot be empty".to_string(),
        ));
    }
    if project_name == "."
        || project_name == ".."
        || project_name.contains(['/', '\\'])
        || project_name.contains('\0')
    {
        return Err(DockerMcpError::InvalidArgument(format!(
            "project_name '{project_name}' must not contain path separators"
        )));
    }
    Ok(())
}

/// Deploys compose stacks through a [`ComposeBackend`]
pub struct ComposeDeployer {
    backend: Arc<dyn ComposeBackend>,
    compose_dir: PathBuf,
}

impl ComposeDeployer {
    pub fn new(backend: Arc<dyn ComposeBackend>, compose_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            compose_dir: compose_dir.into(),
        }
    }

    pub fn compose_dir(&self) -> &Path {
        &self.compose_dir
    }

    /// Deploy `compose_yaml` as project `project_name`, recording into `trace`.
    ///
    /// Blocks for the whole down/up/ps sequence.
    pub fn deploy(
        &self,
        compose_yaml: &str,
        project_name: &str,
        trace: DebugTrace,
    ) -> Result<DeployReport, DeployFailure> {
        if let Err(e) = validate_project_name(project_name) {
            return Err(DeployFailure::new(e, trace));
        }

        trace.section("Original YAML", compose_yaml);
        let spec = match ComposeSpec::parse(compose_yaml) {
            Ok(spec) => spec,
            Err(e) => return Err(DeployFailure::new(e, trace)),
        };
        let normalized = match spec.to_canonical_yaml() {
            Ok(yaml) => yaml,
            Err(e) => return Err(DeployFailure::new(e, trace)),
        };
        trace.section("Loaded YAML Structure", normalized.trim_end());
        trace.push(format!("Services: {}", spec.service_names().join(", ")));

        let compose_file =
            match PersistedComposeFile::write(&self.compose_dir, project_name, &normalized) {
                Ok(file) => file,
                Err(e) => return Err(DeployFailure::new(e, trace)),
            };

        let result = self.run_stack(compose_file.path(), project_name, &trace);
        drop(compose_file);

        match result {
            Ok(services) => {
                info!(project = project_name, "compose stack deployed");
                Ok(DeployReport {
                    project_name: project_name.to_string(),
                    services,
                    trace,
                })
            }
            Err(e) => {
                warn!(project = project_name, error = %e, "compose deployment failed");
                Err(DeployFailure::new(e, trace))
            }
        }
    }

    /// Down (non-fatal), up (fatal), ps (non-fatal). Returns the service listing.
    fn run_stack(
        &self,
        file: &Path,
        project_name: &str,
        trace: &DebugTrace,
    ) -> Result<String, DockerMcpError> {
        match StepOutcome::from(self.backend.down(file, project_name)) {
            StepOutcome::Succeeded(output) => trace.command("Down", &output),
            StepOutcome::Exited(output) => {
                trace.command("Down", &output);
                trace.warning("down", format!("exited with code {}", output.exit_code));
            }
            StepOutcome::Failed(e) => trace.warning("down", e),
        }

        match StepOutcome::from(self.backend.up(file, project_name)) {
            StepOutcome::Succeeded(output) => trace.command("Up", &output),
            StepOutcome::Exited(output) => {
                trace.command("Up", &output);
                return Err(DockerMcpError::DeploymentFailed(format!(
                    "exit code {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                )));
            }
            StepOutcome::Failed(e) => return Err(DockerMcpError::DeploymentFailed(e.to_string())),
        }

        let services = match StepOutcome::from(self.backend.ps(file, project_name)) {
            StepOutcome::Succeeded(output) => {
                trace.command("Ps", &output);
                output.stdout
            }
            StepOutcome::Exited(output) => {
                trace.command("Ps", &output);
                SERVICES_UNAVAILABLE.to_string()
            }
            StepOutcome::Failed(e) => {
                trace.warning("ps", e);
                SERVICES_UNAVAILABLE.to_string()
            }
        };

        Ok(services)
    }
}
