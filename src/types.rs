//! Core types shared by the handlers, the engine client and the deployer

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Captured result of one engine or compose command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Process exit code (`-1` when the process was killed by a signal)
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with status zero
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Text returned to the tool caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Human-readable body
    pub text: String,
    /// Whether the text describes a failure
    pub is_error: bool,
}

impl ToolOutput {
    /// Create a successful output
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Create a failed output
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Ordered diagnostic lines collected during one tool invocation.
///
/// Clones share the same buffer, so a trace handed to a blocking task can still
/// be read by the caller after a timeout.
#[derive(Debug, Clone, Default)]
pub struct DebugTrace {
    lines: Arc<Mutex<Vec<String>>>,
}

impl DebugTrace {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_lines<R>(&self, f: impl FnOnce(&mut Vec<String>) -> R) -> R {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut lines)
    }

    /// Append a single line
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        self.with_lines(|lines| lines.push(line));
    }

    /// Append a `=== title ===` header followed by a body
    pub fn section(&self, title: &str, body: impl Into<String>) {
        let body = body.into();
        self.with_lines(|lines| {
            if lines.is_empty() {
                lines.push(format!("=== {title} ==="));
            } else {
                lines.push(format!("\n=== {title} ==="));
            }
            lines.push(body);
        });
    }

    /// Append the exit code and captured streams of a command
    pub fn command(&self, name: &str, output: &CommandOutput) {
        self.with_lines(|lines| {
            lines.push(format!("\n=== {name} Command ==="));
            lines.push(format!("Return Code: {}", output.exit_code));
            lines.push(format!("Stdout: {}", output.stdout));
            lines.push(format!("Stderr: {}", output.stderr));
        });
    }

    /// Append a non-fatal warning for a named step
    pub fn warning(&self, step: &str, message: impl fmt::Display) {
        self.push(format!("Warning during {step}: {message}"));
    }

    pub fn lines(&self) -> Vec<String> {
        self.with_lines(|lines| lines.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.with_lines(|lines| lines.is_empty())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.with_lines(|lines| lines.iter().any(|line| line.contains(needle)))
    }
}

impl fmt::Display for DebugTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.with_lines(|lines| lines.join("\n"));
        f.write_str(&joined)
    }
}

/// Errors surfaced by the Docker tools
#[derive(Debug, Error)]
pub enum DockerMcpError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid YAML format: {0}")]
    InvalidSpecification(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Deploy failed: {0}")]
    DeploymentFailed(String),

    #[error("Docker engine error during {operation}: {message}")]
    Engine { operation: String, message: String },

    #[error("Failed to persist compose file {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },
}

impl DockerMcpError {
    pub fn engine(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Engine {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(what: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.to_string(),
        }
    }
}
