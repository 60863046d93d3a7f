//! Compose specifications, their on-disk copies, and the compose backend

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::config::EngineConnection;
use crate::engine::run_docker;
use crate::types::{CommandOutput, DockerMcpError};

// ============================================================================
// Compose specification
// ============================================================================

/// A parsed compose document
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeSpec {
    root: Value,
}

impl ComposeSpec {
    /// Parse compose YAML. The document must be a mapping.
    pub fn parse(text: &str) -> Result<Self, DockerMcpError> {
        let root: Value = serde_yaml::from_str(text)
            .map_err(|e| DockerMcpError::InvalidSpecification(e.to_string()))?;

        if !root.is_mapping() {
            return Err(DockerMcpError::InvalidSpecification(
                "compose document must be a mapping".to_string(),
            ));
        }

        Ok(Self { root })
    }

    /// Re-serialize in block style with the original key order
    pub fn to_canonical_yaml(&self) -> Result<String, DockerMcpError> {
        serde_yaml::to_string(&self.root)
            .map_err(|e| DockerMcpError::InvalidSpecification(e.to_string()))
    }

    /// Names under the top-level `services` key, in document order
    pub fn service_names(&self) -> Vec<String> {
        self.root
            .get("services")
            .and_then(Value::as_mapping)
            .map(|services| {
                services
                    .keys()
                    .filter_map(|key| key.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

// ============================================================================
// Persisted compose file
// ============================================================================

/// File name used for a project's persisted compose file
pub fn compose_file_name(project_name: &str) -> String {
    format!("{project_name}-docker-compose.yml")
}

/// Compose file written for one deployment attempt.
///
/// Dropping it removes the file, then the directory if nothing else is left in it.
#[derive(Debug)]
pub struct PersistedComposeFile {
    path: PathBuf,
}

impl PersistedComposeFile {
    /// Write `contents` to `<dir>/<project>-docker-compose.yml` and sync it to disk
    pub fn write(dir: &Path, project_name: &str, contents: &str) -> Result<Self, DockerMcpError> {
        let path = dir.join(compose_file_name(project_name));
        let persist_err = |source: io::Error| DockerMcpError::Persist {
            path: path.clone(),
            source,
        };

        // A concurrent cleanup may remove the directory between creating it and
        // creating the file.
        let mut attempts = 0;
        let mut file = loop {
            fs::create_dir_all(dir).map_err(persist_err)?;
            match File::create(&path) {
                Ok(file) => break file,
                Err(e) if e.kind() == io::ErrorKind::NotFound && attempts < 3 => attempts += 1,
                Err(e) => return Err(persist_err(e)),
            }
        };

        let guard = Self { path: path.clone() };

        file.write_all(contents.as_bytes()).map_err(persist_err)?;
        file.flush().map_err(persist_err)?;
        #[cfg(not(windows))]
        file.sync_all().map_err(persist_err)?;

        debug!(path = %guard.path.display(), "persisted compose file");
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cleanup(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        if let Some(dir) = self.path.parent() {
            // remove_dir refuses non-empty directories, so other projects' files survive
            match fs::remove_dir(dir) {
                Ok(()) => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty
                    ) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl Drop for PersistedComposeFile {
    fn drop(&mut self) {
        match self.cleanup() {
            Ok(()) => debug!(path = %self.path.display(), "removed compose file"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Warning during cleanup"),
        }
    }
}

// ============================================================================
// Compose backend
// ============================================================================

/// Runs compose commands against a persisted file.
///
/// All calls block; callers dispatch them off the async runtime. An `Err` means
/// the command could not be run at all; a non-zero exit is reported in the
/// returned [`CommandOutput`].
pub trait ComposeBackend: Send + Sync {
    fn down(&self, file: &Path, project: &str) -> Result<CommandOutput, DockerMcpError>;
    fn up(&self, file: &Path, project: &str) -> Result<CommandOutput, DockerMcpError>;
    fn ps(&self, file: &Path, project: &str) -> Result<CommandOutput, DockerMcpError>;
}

/// `docker compose` through the CLI
#[derive(Debug, Clone, Default)]
pub struct DockerComposeCli {
    connection: EngineConnection,
}

impl DockerComposeCli {
    pub fn new(connection: EngineConnection) -> Self {
        Self { connection }
    }

    fn compose_args(file: &Path, project: &str, command: &[&str]) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "-f".to_string(),
            file.display().to_string(),
            "-p".to_string(),
            project.to_string(),
        ];
        args.extend(command.iter().map(|arg| arg.to_string()));
        args
    }

    fn run(
        &self,
        file: &Path,
        project: &str,
        command: &[&str],
    ) -> Result<CommandOutput, DockerMcpError> {
        let args = Self::compose_args(file, project, command);
        run_docker(&self.connection, &args)
            .map_err(|e| DockerMcpError::engine(format!("compose {}", command.join(" ")), e))
    }
}

impl ComposeBackend for DockerComposeCli {
    fn down(&self, file: &Path, project: &str) -> Result<CommandOutput, DockerMcpError> {
        self.run(file, project, &["down"])
    }

    fn up(&self, file: &Path, project: &str) -> Result<CommandOutput, DockerMcpError> {
        self.run(file, project, &["up", "-d"])
    }

    fn ps(&self, file: &Path, project: &str) -> Result<CommandOutput, DockerMcpError> {
        self.run(file, project, &["ps"])
    }
}
