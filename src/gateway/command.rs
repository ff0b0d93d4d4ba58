// src/gateway/command.rs

//! Gateway commands with optimistic registry updates.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::engine::{RegistryHandle, RegistryMessage};
use crate::errors::{Operation, Result, SyncError};
use crate::gateway::service::{CommandResult, LaunchSpec, ProcessService};
use crate::types::{ProcessId, ProcessState};

/// Sends imperative commands to the [`ProcessService`] and records their
/// optimistic and final effects in the registry.
///
/// Every call marks the registry as loading while in flight, and every
/// failure is recorded as the top-level error before it is returned.
#[derive(Clone)]
pub struct CommandGateway {
    registry: RegistryHandle,
    service: Arc<dyn ProcessService>,
}

impl fmt::Debug for CommandGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGateway")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl CommandGateway {
    pub fn new(registry: RegistryHandle, service: Arc<dyn ProcessService>) -> Self {
        Self { registry, service }
    }

    /// Start a process.
    ///
    /// The entry goes to `starting` before the service is called. The move to
    /// `running` is left to the `process-started` event, since the backend
    /// does not order its acknowledgement relative to its events.
    pub async fn start(&self, id: &str, spec: &LaunchSpec) -> Result<CommandResult> {
        self.begin()?;
        let result = self.start_inner(id, spec).await;
        self.finish()?;
        result
    }

    async fn start_inner(&self, id: &str, spec: &LaunchSpec) -> Result<CommandResult> {
        info!(id = %id, "starting process");
        self.registry.send(RegistryMessage::StartRequested { id: id.to_string() })?;

        match self.service.start(id, spec).await {
            Ok(result) if result.success && result.pid.is_some() => {
                if let Some(pid) = result.pid {
                    debug!(id = %id, pid, "start acknowledged; waiting for started event");
                    self.registry.send(RegistryMessage::StartAcknowledged {
                        id: id.to_string(),
                        pid,
                    })?;
                }
                Ok(result)
            }
            Ok(result) if result.success => {
                debug!(id = %id, message = %result.message, "start succeeded without a pid; nothing to track");
                self.registry.send(RegistryMessage::StartRolledBack {
                    id: id.to_string(),
                    error: None,
                })?;
                Ok(result)
            }
            Ok(result) => Err(self.start_failed(id, result.failure_message())?),
            Err(err) => Err(self.start_failed(id, err.to_string())?),
        }
    }

    fn start_failed(&self, id: &str, message: String) -> Result<SyncError> {
        warn!(id = %id, error = %message, "failed to start process");
        self.registry.send(RegistryMessage::StartRolledBack {
            id: id.to_string(),
            error: Some(message.clone()),
        })?;
        self.command_failed(Operation::Start, Some(id), message)
    }

    /// Stop a process. Output is kept whatever the outcome.
    pub async fn stop(&self, id: &str) -> Result<CommandResult> {
        self.begin()?;
        let result = self.stop_inner(id).await;
        self.finish()?;
        result
    }

    async fn stop_inner(&self, id: &str) -> Result<CommandResult> {
        info!(id = %id, "stopping process");
        self.registry.send(RegistryMessage::StopRequested { id: id.to_string() })?;

        let message = match self.service.stop(id).await {
            Ok(result) if result.success => {
                self.registry.send(RegistryMessage::StopSucceeded { id: id.to_string() })?;
                return Ok(result);
            }
            Ok(result) => result.failure_message(),
            Err(err) => err.to_string(),
        };

        warn!(id = %id, error = %message, "failed to stop process");
        self.registry.send(RegistryMessage::StopFailed {
            id: id.to_string(),
            message: message.clone(),
        })?;
        Err(self.command_failed(Operation::Stop, Some(id), message)?)
    }

    /// Kill every process. On success the registry, output included, is
    /// emptied; on failure it is left as it was.
    pub async fn kill_all(&self) -> Result<CommandResult> {
        self.begin()?;
        let result = self.kill_all_inner().await;
        self.finish()?;
        result
    }

    async fn kill_all_inner(&self) -> Result<CommandResult> {
        info!("killing all processes");

        let message = match self.service.kill_all().await {
            Ok(result) if result.success => {
                self.registry.send(RegistryMessage::KillAllSucceeded)?;
                return Ok(result);
            }
            Ok(result) => result.failure_message(),
            Err(err) => err.to_string(),
        };

        warn!(error = %message, "failed to kill all processes");
        Err(self.command_failed(Operation::KillAll, None, message)?)
    }

    /// Poll every process and merge the snapshot, then return the merged
    /// local view.
    pub async fn get_all_processes(&self) -> Result<BTreeMap<ProcessId, ProcessState>> {
        self.begin()?;
        let result = self.reconcile_snapshot().await;
        self.finish()?;
        result?;

        self.registry.flush().await?;
        Ok(self.registry.snapshot().to_map())
    }

    /// Poll every process and merge the snapshot, without touching the
    /// loading flag. Used for seeding and periodic reconciliation.
    pub async fn reconcile_snapshot(&self) -> Result<()> {
        match self.service.get_all_processes().await {
            Ok(processes) => {
                debug!(count = processes.len(), "merging process snapshot");
                self.registry.send(RegistryMessage::Snapshot { processes })?;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to poll process snapshot");
                Err(self.command_failed(Operation::GetAllProcesses, None, err.to_string())?)
            }
        }
    }

    /// Query one process, merge the answer, and return the merged local
    /// entry (which may exist even when the service no longer knows the id).
    pub async fn get_process_status(&self, id: &str) -> Result<Option<ProcessState>> {
        self.begin()?;
        let result = self.service.get_process_status(id).await;
        self.finish()?;

        match result {
            Ok(snapshot) => {
                self.registry.send(RegistryMessage::SnapshotOne {
                    id: id.to_string(),
                    snapshot,
                })?;
                self.registry.flush().await?;
                Ok(self.registry.snapshot().get(id).cloned())
            }
            Err(err) => {
                warn!(id = %id, error = %err, "failed to query process status");
                Err(self.command_failed(Operation::GetProcessStatus, Some(id), err.to_string())?)
            }
        }
    }

    fn begin(&self) -> Result<()> {
        self.registry.send(RegistryMessage::CommandStarted)
    }

    fn finish(&self) -> Result<()> {
        self.registry.send(RegistryMessage::CommandFinished)
    }

    /// Record a top-level error and build the typed error for the caller.
    ///
    /// The outer `Result` only fails if the registry itself is gone.
    fn command_failed(
        &self,
        operation: Operation,
        id: Option<&str>,
        message: String,
    ) -> Result<SyncError> {
        let report = match id {
            Some(id) => format!("Failed to {operation} '{id}': {message}"),
            None => format!("Failed to {operation}: {message}"),
        };
        self.registry.send(RegistryMessage::ReportError { message: report })?;

        Ok(SyncError::CommandFailed {
            operation,
            id: id.map(str::to_string),
            message,
        })
    }
}
