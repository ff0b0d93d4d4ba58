// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Caller-assigned, opaque key identifying one tracked process.
pub type ProcessId = String;

/// Lifecycle status of a tracked process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Starting => "starting",
            ProcessStatus::Running => "running",
            ProcessStatus::Stopping => "stopping",
            ProcessStatus::Error => "error",
        }
    }

    /// `stopped` and `error` are the settled states; nothing is in flight.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessStatus::Stopped | ProcessStatus::Error)
    }
}

impl Default for ProcessStatus {
    fn default() -> Self {
        ProcessStatus::Stopped
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumer-facing record of one process, including its buffered output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProcessState {
    pub pid: Option<u32>,
    pub status: ProcessStatus,
    pub started_at: Option<String>,
    pub error_message: Option<String>,
    pub output: Vec<String>,
    pub is_background: bool,
}

/// Process record as reported by the execution service.
///
/// Snapshots never carry output; any `output` field on the wire is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSnapshot {
    #[serde(default)]
    pub pid: Option<u32>,
    pub status: ProcessStatus,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub is_background: Option<bool>,
}

impl ProcessSnapshot {
    pub fn running(pid: u32, started_at: impl Into<String>) -> Self {
        Self {
            pid: Some(pid),
            status: ProcessStatus::Running,
            started_at: Some(started_at.into()),
            error_message: None,
            is_background: None,
        }
    }
}

/// What to do with events that name an id the registry has never seen.
///
/// - `Admit`: create the entry, log at debug.
/// - `Warn`: create the entry, log at warn (default).
/// - `Reject`: drop the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownIdPolicy {
    Admit,
    Warn,
    Reject,
}

impl Default for UnknownIdPolicy {
    fn default() -> Self {
        UnknownIdPolicy::Warn
    }
}

impl FromStr for UnknownIdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admit" => Ok(UnknownIdPolicy::Admit),
            "warn" => Ok(UnknownIdPolicy::Warn),
            "reject" => Ok(UnknownIdPolicy::Reject),
            other => Err(format!(
                "invalid unknown_ids policy: {other} (expected \"admit\", \"warn\" or \"reject\")"
            )),
        }
    }
}
