// src/client.rs

//! Consumer-facing facade.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::config::SyncConfig;
use crate::engine::{CoreRegistry, RegistryActor, RegistryHandle, RegistryMessage, RegistrySettings, RegistryView};
use crate::errors::Result;
use crate::gateway::{CommandGateway, CommandResult, LaunchSpec, ProcessService};
use crate::subscriber::{AttachReport, EventSource, SubscriptionManager};
use crate::types::{ProcessId, ProcessState};

/// One consistent, observable view of every process the backend runs.
///
/// Wires together the registry actor, the command gateway and the
/// subscription manager. Must be created inside a Tokio runtime.
pub struct ProcessSync {
    registry: RegistryHandle,
    gateway: CommandGateway,
    subscriptions: SubscriptionManager,
}

impl fmt::Debug for ProcessSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSync")
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl ProcessSync {
    pub fn new(
        config: &SyncConfig,
        service: Arc<dyn ProcessService>,
        source: Arc<dyn EventSource>,
    ) -> Self {
        let core = CoreRegistry::new(RegistrySettings::from_config(config));
        let registry = RegistryActor::spawn(core);
        let gateway = CommandGateway::new(registry.clone(), service);
        let subscriptions = SubscriptionManager::new(
            source,
            gateway.clone(),
            registry.clone(),
            config.poll_interval(),
        );

        Self {
            registry,
            gateway,
            subscriptions,
        }
    }

    /// Subscribe to every event channel and seed from a snapshot.
    pub async fn attach(&mut self) -> Result<AttachReport> {
        self.subscriptions.attach().await
    }

    pub fn detach(&mut self) {
        self.subscriptions.detach();
    }

    pub fn is_attached(&self) -> bool {
        self.subscriptions.is_attached()
    }

    pub async fn start_process(&self, id: &str, spec: &LaunchSpec) -> Result<CommandResult> {
        self.gateway.start(id, spec).await
    }

    pub async fn stop_process(&self, id: &str) -> Result<CommandResult> {
        self.gateway.stop(id).await
    }

    pub async fn get_process_status(&self, id: &str) -> Result<Option<ProcessState>> {
        self.gateway.get_process_status(id).await
    }

    pub async fn get_all_processes(&self) -> Result<BTreeMap<ProcessId, ProcessState>> {
        self.gateway.get_all_processes().await
    }

    pub async fn kill_all_processes(&self) -> Result<CommandResult> {
        self.gateway.kill_all().await
    }

    /// Empty one process's output buffer; status and pid are untouched.
    pub fn clear_process_output(&self, id: &str) -> Result<()> {
        self.registry.send(RegistryMessage::ClearOutput { id: id.to_string() })
    }

    /// Receiver notified after every registry change.
    pub fn state(&self) -> watch::Receiver<RegistryView> {
        self.registry.subscribe()
    }

    /// Current view. Messages still queued may not be reflected yet; see
    /// [`ProcessSync::settle`].
    pub fn view(&self) -> RegistryView {
        self.registry.snapshot()
    }

    /// Wait until everything queued so far has been applied.
    pub async fn settle(&self) -> Result<()> {
        self.registry.flush().await
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }
}
