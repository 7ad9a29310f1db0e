//! Run controller settings.

use crate::types::{MachineError, DEFAULT_INTERVAL_MS, DEFAULT_LOG_CAPACITY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Settings for a [`RunController`](crate::controller::RunController).
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "intervalMs": 100, "maxSteps": 5000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Milliseconds between two automatic steps while running.
    pub interval_ms: u64,
    /// Maximum number of entries kept in the execution log.
    pub log_capacity: usize,
    /// Pause automatically once this many steps have been applied. `None` or `0` runs unbounded.
    pub max_steps: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            log_capacity: DEFAULT_LOG_CAPACITY,
            max_steps: None,
        }
    }
}

impl ControllerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// The effective step limit. A limit of `0` means no limit.
    pub fn step_limit(&self) -> Option<u64> {
        self.max_steps.filter(|&limit| limit > 0)
    }

    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self, MachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            MachineError::FileError(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            MachineError::ValidationError(format!("Invalid config {}: {}", path.display(), e))
        })
    }
}
