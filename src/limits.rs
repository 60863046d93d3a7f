//! Time bounds and output sizes for engine operations

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound for pulling and starting a container (200 seconds)
pub const DEFAULT_CREATE_TIMEOUT_MS: u64 = 200_000;
/// Default bound for a full compose deployment (200 seconds)
pub const DEFAULT_DEPLOY_TIMEOUT_MS: u64 = 200_000;
/// Default bound for list/inspect/logs/stats queries
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;
/// Default number of log lines returned by `get-logs`
pub const DEFAULT_LOG_TAIL: u32 = 100;

/// Limits applied to every tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLimits {
    /// Timeout for image pull plus container run
    pub create_timeout_ms: u64,
    /// Timeout for the down/up/ps deployment sequence
    pub deploy_timeout_ms: u64,
    /// Timeout for read-only engine queries
    pub query_timeout_ms: u64,
    /// Log lines fetched from the end of a container's output
    pub log_tail: u32,
}

impl Default for OperationLimits {
    fn default() -> Self {
        Self {
            create_timeout_ms: DEFAULT_CREATE_TIMEOUT_MS,
            deploy_timeout_ms: DEFAULT_DEPLOY_TIMEOUT_MS,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            log_tail: DEFAULT_LOG_TAIL,
        }
    }
}

impl OperationLimits {
    /// Create new limits with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_millis(self.deploy_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Builder: set create timeout
    pub fn with_create_timeout_ms(mut self, timeout: u64) -> Self {
        self.create_timeout_ms = timeout;
        self
    }

    /// Builder: set deploy timeout
    pub fn with_deploy_timeout_ms(mut self, timeout: u64) -> Self {
        self.deploy_timeout_ms = timeout;
        self
    }

    /// Builder: set query timeout
    pub fn with_query_timeout_ms(mut self, timeout: u64) -> Self {
        self.query_timeout_ms = timeout;
        self
    }

    /// Builder: set log tail length
    pub fn with_log_tail(mut self, lines: u32) -> Self {
        self.log_tail = lines;
        self
    }
}

/// Whole seconds for user-facing timeout messages, rounded up
pub fn timeout_secs(timeout_ms: u64) -> u64 {
    timeout_ms.div_ceil(1000)
}
