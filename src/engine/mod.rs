// src/engine/mod.rs

//! Process registry and reconciliation engine.
//!
//! This module ties together:
//! - the per-process entries and their bounded output buffers
//! - the reconciliation policy that merges command results, snapshots and
//!   push events into one state per process, whatever order they arrive in
//! - the single-writer actor that owns the registry and publishes read-only
//!   views to observers
//!
//! The pure state machine lives in [`core`] and [`reconcile`]; the async
//! shell is implemented in [`actor`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::events::ProcessEvent;
use crate::types::{ProcessId, ProcessSnapshot, ProcessState};

/// Messages flowing into the registry from the gateway, the event subscriber
/// and the consumer facade.
#[derive(Debug, Clone)]
pub enum RegistryMessage {
    /// A push event from the execution service.
    Event(ProcessEvent),
    /// `start()` is about to be sent; write the optimistic `starting` entry.
    StartRequested { id: ProcessId },
    /// `start()` returned a pid; the `started` event may still be on its way.
    StartAcknowledged { id: ProcessId, pid: u32 },
    /// `start()` failed (`error` is set) or returned no pid (`error` is
    /// `None`); undo the optimistic entry if nothing else has settled it.
    StartRolledBack {
        id: ProcessId,
        error: Option<String>,
    },
    /// `stop()` is about to be sent.
    StopRequested { id: ProcessId },
    StopSucceeded { id: ProcessId },
    StopFailed { id: ProcessId, message: String },
    /// Result of a `get_all_processes()` poll.
    Snapshot {
        processes: HashMap<ProcessId, ProcessSnapshot>,
    },
    /// Result of a `get_process_status(id)` query.
    SnapshotOne {
        id: ProcessId,
        snapshot: Option<ProcessSnapshot>,
    },
    KillAllSucceeded,
    ClearOutput { id: ProcessId },
    /// A gateway command went in flight.
    CommandStarted,
    /// A gateway command completed, successfully or not.
    CommandFinished,
    /// Record a top-level error for consumers.
    ReportError { message: String },
}

/// Read-only view published to observers after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryView {
    pub processes: BTreeMap<ProcessId, Arc<ProcessState>>,
    /// True while at least one gateway command is in flight.
    pub loading: bool,
    /// The most recent top-level error, cleared when the next command starts.
    pub error: Option<String>,
}

impl RegistryView {
    pub fn get(&self, id: &str) -> Option<&ProcessState> {
        self.processes.get(id).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Plain owned copy, e.g. for JSON output.
    pub fn to_map(&self) -> BTreeMap<ProcessId, ProcessState> {
        self.processes
            .iter()
            .map(|(id, state)| (id.clone(), state.as_ref().clone()))
            .collect()
    }
}

pub mod actor;
pub mod core;
pub mod entry;
pub mod reconcile;

pub use actor::{RegistryActor, RegistryHandle};
pub use self::core::{CoreRegistry, RegistrySettings};
pub use entry::ProcessEntry;
pub use reconcile::Reconciler;
