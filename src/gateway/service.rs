// src/gateway/service.rs

//! Pluggable process service abstraction.
//!
//! The gateway talks to a `ProcessService` instead of a concrete transport.
//! Production code plugs in whatever bridges to the execution backend (an
//! IPC channel, an HTTP client, ...); tests provide a scripted fake that
//! records calls and returns canned results.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::{ProcessId, ProcessSnapshot};

/// Boxed future returned by every [`ProcessService`] call.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Everything the backend needs to launch one process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpec {
    /// Shell command(s); `None` or blank means a URL-only launch.
    pub launch_commands: Option<String>,
    pub working_directory: Option<String>,
    pub environment_variables: Option<HashMap<String, String>>,
    pub url: Option<String>,
    pub auto_launch_browser: Option<bool>,
    /// Seconds to wait before opening the browser.
    pub browser_delay: Option<u32>,
    pub port_to_check: Option<u16>,
    /// Seconds to wait for `port_to_check` to accept connections.
    pub port_check_timeout: Option<u32>,
    pub terminal_type: Option<String>,
    /// Opaque, backend-defined terminal options.
    pub terminal_settings: Option<serde_json::Value>,
}

impl LaunchSpec {
    pub fn command(cmd: impl Into<String>) -> Self {
        Self {
            launch_commands: Some(cmd.into()),
            ..Self::default()
        }
    }
}

/// Terminal result of a start/stop/kill-all call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            pid: None,
            error: None,
        }
    }

    pub fn started(pid: u32) -> Self {
        Self {
            success: true,
            message: format!("Process started with PID {pid}"),
            pid: Some(pid),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            message: error.clone(),
            pid: None,
            error: Some(error),
        }
    }

    /// Best description of why the call failed.
    pub fn failure_message(&self) -> String {
        match &self.error {
            Some(error) if !error.is_empty() => error.clone(),
            _ => self.message.clone(),
        }
    }
}

/// The external process-execution service.
///
/// Each call is a single round trip. A logical failure is reported as
/// `Ok(CommandResult { success: false, .. })`; `Err` means the call itself
/// could not be completed.
pub trait ProcessService: Send + Sync {
    fn start<'a>(&'a self, id: &'a str, spec: &'a LaunchSpec) -> ServiceFuture<'a, CommandResult>;

    fn stop<'a>(&'a self, id: &'a str) -> ServiceFuture<'a, CommandResult>;

    /// Status of every process the service knows about. Never carries output.
    fn get_all_processes(&self) -> ServiceFuture<'_, HashMap<ProcessId, ProcessSnapshot>>;

    fn get_process_status<'a>(&'a self, id: &'a str)
    -> ServiceFuture<'a, Option<ProcessSnapshot>>;

    fn kill_all(&self) -> ServiceFuture<'_, CommandResult>;
}
