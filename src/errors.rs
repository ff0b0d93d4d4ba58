// src/errors.rs

//! Crate-wide error type.
//!
//! Every failure that crosses the gateway or subscription boundary is turned
//! into a [`SyncError`] value; nothing is allowed to escape as a panic.

use std::fmt;

use thiserror::Error;

use crate::events::EventChannel;
use crate::types::ProcessId;

#[derive(Error, Debug)]
pub enum SyncError {
    /// A gateway command returned `success = false` (or its transport failed).
    #[error("{operation} failed: {message}")]
    CommandFailed {
        operation: Operation,
        id: Option<ProcessId>,
        message: String,
    },

    /// Registering a listener on an event channel failed.
    #[error("Subscription to {channel} failed: {message}")]
    Subscription {
        channel: EventChannel,
        message: String,
    },

    /// The external process service could not be reached.
    #[error("Process service error: {0}")]
    Service(String),

    #[error("Malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The registry actor has shut down and no longer accepts messages.
    #[error("Process registry is closed")]
    RegistryClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Gateway operation named in [`SyncError::CommandFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Stop,
    KillAll,
    GetAllProcesses,
    GetProcessStatus,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::KillAll => "kill-all",
            Operation::GetAllProcesses => "get-all-processes",
            Operation::GetProcessStatus => "get-process-status",
        };
        f.write_str(name)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SyncError>;
