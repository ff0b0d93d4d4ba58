// src/replay.rs

//! Offline replay of captured event streams.
//!
//! Each input line is an [`EventEnvelope`] (`{"channel": ..., "payload": ...}`).
//! Lines are published on a [`LocalEventBus`] and go through the same
//! decode, dispatch and reconciliation path as live events.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::ProcessSync;
use crate::config::SyncConfig;
use crate::engine::RegistryView;
use crate::errors::{Result, SyncError};
use crate::events::EventEnvelope;
use crate::gateway::{CommandResult, LaunchSpec, ProcessService, ServiceFuture};
use crate::subscriber::LocalEventBus;
use crate::types::{ProcessId, ProcessSnapshot};

/// Service stand-in for replays: knows no processes, refuses commands.
#[derive(Debug, Default)]
pub struct OfflineService;

const OFFLINE: &str = "process service is offline (replay mode)";

impl ProcessService for OfflineService {
    fn start<'a>(&'a self, _id: &'a str, _spec: &'a LaunchSpec) -> ServiceFuture<'a, CommandResult> {
        Box::pin(async { Ok(CommandResult::failed(OFFLINE)) })
    }

    fn stop<'a>(&'a self, _id: &'a str) -> ServiceFuture<'a, CommandResult> {
        Box::pin(async { Ok(CommandResult::failed(OFFLINE)) })
    }

    fn get_all_processes(&self) -> ServiceFuture<'_, HashMap<ProcessId, ProcessSnapshot>> {
        Box::pin(async { Ok(HashMap::new()) })
    }

    fn get_process_status<'a>(&'a self, _id: &'a str) -> ServiceFuture<'a, Option<ProcessSnapshot>> {
        Box::pin(async { Ok(None) })
    }

    fn kill_all(&self) -> ServiceFuture<'_, CommandResult> {
        Box::pin(async { Ok(CommandResult::failed(OFFLINE)) })
    }
}

/// Summary of a replay run.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub view: RegistryView,
    /// Lines published to the bus.
    pub applied: usize,
    /// Lines skipped because they were not valid envelopes.
    pub skipped: usize,
}

/// Replay every envelope in `reader` and return the resulting registry.
pub async fn replay_events(config: &SyncConfig, reader: impl BufRead) -> Result<ReplayOutcome> {
    let bus = Arc::new(LocalEventBus::new());
    let mut sync = ProcessSync::new(config, Arc::new(OfflineService), bus.clone());
    sync.attach().await?;

    let mut applied = 0;
    let mut skipped = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match serde_json::from_str::<EventEnvelope>(line) {
            Ok(envelope) => {
                debug!(line = index + 1, channel = %envelope.channel, "replaying event");
                bus.emit(envelope.channel, envelope.payload);
                applied += 1;
            }
            Err(err) => {
                warn!(line = index + 1, error = %SyncError::from(err), "skipping invalid replay line");
                skipped += 1;
            }
        }
    }

    sync.settle().await?;
    let view = sync.view();
    sync.detach();

    info!(applied, skipped, processes = view.len(), "replay finished");
    Ok(ReplayOutcome {
        view,
        applied,
        skipped,
    })
}
