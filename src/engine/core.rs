// src/engine/core.rs

//! Pure core registry.
//!
//! This module contains a synchronous, deterministic registry that consumes
//! [`RegistryMessage`]s and produces an updated [`RegistryView`]. It has no
//! channels, no Tokio types, and performs no IO, so the whole reconciliation
//! policy can be unit tested by feeding it messages in any order.
//!
//! The async shell (`engine::actor::RegistryActor`) is responsible for:
//! - reading messages from the mailbox
//! - publishing views to observers

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::engine::entry::ProcessEntry;
use crate::engine::reconcile::Reconciler;
use crate::engine::{RegistryMessage, RegistryView};
use crate::output::{DEFAULT_MAX_LINES, LineFormatter};
use crate::types::{ProcessId, UnknownIdPolicy};

/// Settings the reconciliation rules depend on.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub max_output_lines: usize,
    pub unknown_ids: UnknownIdPolicy,
    pub formatter: LineFormatter,
}

impl RegistrySettings {
    pub fn from_config(cfg: &SyncConfig) -> Self {
        Self {
            max_output_lines: cfg.output.max_lines,
            unknown_ids: cfg.registry.unknown_ids,
            formatter: LineFormatter::new(cfg.output.timestamp_format.clone()),
        }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            max_output_lines: DEFAULT_MAX_LINES,
            unknown_ids: UnknownIdPolicy::default(),
            formatter: LineFormatter::default(),
        }
    }
}

/// Pure registry state.
///
/// This owns:
/// - the process entries (single source of truth)
/// - bookkeeping the reconciliation rules need (retired and pending pids,
///   known ids)
/// - the in-flight command counter and top-level error
/// - the last published view, refreshed incrementally
#[derive(Debug)]
pub struct CoreRegistry {
    entries: BTreeMap<ProcessId, ProcessEntry>,
    retired: HashMap<ProcessId, u32>,
    pending: HashMap<ProcessId, u32>,
    known: HashSet<ProcessId>,
    dirty: BTreeSet<ProcessId>,
    in_flight: usize,
    error: Option<String>,
    settings: RegistrySettings,
    view: RegistryView,
}

impl CoreRegistry {
    pub fn new(settings: RegistrySettings) -> Self {
        Self {
            entries: BTreeMap::new(),
            retired: HashMap::new(),
            pending: HashMap::new(),
            known: HashSet::new(),
            dirty: BTreeSet::new(),
            in_flight: 0,
            error: None,
            settings,
            view: RegistryView::default(),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn entry(&self, id: &str) -> Option<&ProcessEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The view as of the last [`CoreRegistry::step`].
    pub fn view(&self) -> &RegistryView {
        &self.view
    }

    /// Apply a single message. Returns `true` if the published view changed.
    pub fn step(&mut self, message: RegistryMessage) -> bool {
        let meta_changed = match message {
            RegistryMessage::CommandStarted => {
                self.in_flight += 1;
                self.error = None;
                true
            }
            RegistryMessage::CommandFinished => {
                if self.in_flight == 0 {
                    warn!("command finished without a matching start");
                }
                self.in_flight = self.in_flight.saturating_sub(1);
                true
            }
            RegistryMessage::ReportError { message } => {
                debug!(error = %message, "recording top-level error");
                self.error = Some(message);
                true
            }
            other => {
                self.apply(other);
                false
            }
        };

        let changed = meta_changed || !self.dirty.is_empty();
        if changed {
            self.refresh_view();
        }
        changed
    }

    fn apply(&mut self, message: RegistryMessage) {
        let mut reconciler = Reconciler::new(
            &mut self.entries,
            &mut self.retired,
            &mut self.pending,
            &mut self.known,
            &mut self.dirty,
            &self.settings,
        );

        match message {
            RegistryMessage::Event(event) => {
                reconciler.apply_event(event);
            }
            RegistryMessage::StartRequested { id } => {
                reconciler.start_requested(&id);
            }
            RegistryMessage::StartAcknowledged { id, pid } => {
                reconciler.start_acknowledged(&id, pid);
            }
            RegistryMessage::StartRolledBack { id, error } => {
                reconciler.start_rolled_back(&id, error);
            }
            RegistryMessage::StopRequested { id } => {
                reconciler.stop_requested(&id);
            }
            RegistryMessage::StopSucceeded { id } => {
                reconciler.stop_succeeded(&id);
            }
            RegistryMessage::StopFailed { id, message } => {
                reconciler.stop_failed(&id, message);
            }
            RegistryMessage::Snapshot { processes } => {
                reconciler.merge_snapshot(processes);
            }
            RegistryMessage::SnapshotOne { id, snapshot } => {
                if let Some(snapshot) = snapshot {
                    reconciler.merge_one(id, snapshot);
                }
            }
            RegistryMessage::KillAllSucceeded => {
                reconciler.kill_all();
            }
            RegistryMessage::ClearOutput { id } => {
                reconciler.clear_output(&id);
            }
            RegistryMessage::CommandStarted
            | RegistryMessage::CommandFinished
            | RegistryMessage::ReportError { .. } => {}
        }
    }

    /// Rebuild view entries only for ids touched since the last refresh.
    fn refresh_view(&mut self) {
        for id in std::mem::take(&mut self.dirty) {
            match self.entries.get(&id) {
                Some(entry) => {
                    self.view.processes.insert(id, Arc::new(entry.to_state()));
                }
                None => {
                    self.view.processes.remove(&id);
                }
            }
        }
        self.view.loading = self.in_flight > 0;
        self.view.error = self.error.clone();
    }
}

impl Default for CoreRegistry {
    fn default() -> Self {
        Self::new(RegistrySettings::default())
    }
}
