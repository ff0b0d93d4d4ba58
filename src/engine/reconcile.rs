// src/engine/reconcile.rs

//! Reconciliation policy: the transition rules for every registry input.
//!
//! Nothing here assumes an ordering between event kinds, between process
//! ids, or between a command's result and the events it causes. Each rule
//! is written so that any interleaving ends in the same state the backend
//! is actually in:
//!
//! - the event stream is authoritative over optimistic command results
//! - status never moves from `running` back to `starting` except through an
//!   explicit new `start()`
//! - a pid, once retired by a stop/exit/error, never brings the id back to
//!   `running`
//! - a `started` event without a pid never means `running`; there is nothing
//!   to track
//! - buffered output is never dropped by anything except `clear_output`, a
//!   successful kill-all, or the eviction cap

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::engine::core::RegistrySettings;
use crate::engine::entry::ProcessEntry;
use crate::events::{EventKind, ProcessEvent};
use crate::output::format::{browser_failed_notice, browser_launched_notice, exit_notice};
use crate::types::{ProcessId, ProcessSnapshot, ProcessStatus, UnknownIdPolicy};

/// Applies reconciliation rules to the registry's maps.
///
/// Every method returns `true` if it changed anything. Every id it touches
/// is recorded in `dirty` so the caller can refresh only those views.
pub struct Reconciler<'a> {
    entries: &'a mut BTreeMap<ProcessId, ProcessEntry>,
    /// Last pid retired per id by a stop/exit/error, to spot stale `started`.
    retired: &'a mut HashMap<ProcessId, u32>,
    /// Pid acknowledged by `start()` whose `started` event has not landed yet.
    pending: &'a mut HashMap<ProcessId, u32>,
    /// Ids that were explicitly started or reported by a snapshot.
    known: &'a mut HashSet<ProcessId>,
    dirty: &'a mut BTreeSet<ProcessId>,
    settings: &'a RegistrySettings,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        entries: &'a mut BTreeMap<ProcessId, ProcessEntry>,
        retired: &'a mut HashMap<ProcessId, u32>,
        pending: &'a mut HashMap<ProcessId, u32>,
        known: &'a mut HashSet<ProcessId>,
        dirty: &'a mut BTreeSet<ProcessId>,
        settings: &'a RegistrySettings,
    ) -> Self {
        Self {
            entries,
            retired,
            pending,
            known,
            dirty,
            settings,
        }
    }

    /// Apply one push event.
    pub fn apply_event(&mut self, event: ProcessEvent) -> bool {
        let ProcessEvent {
            id,
            timestamp,
            kind,
        } = event;

        if !self.entries.contains_key(&id) && !self.admit_unknown(&id, &kind) {
            return false;
        }

        let Some(mut entry) = self.entries.remove(&id) else {
            return false;
        };
        let before = Lifecycle::of(&entry);
        let appends_line = !matches!(
            kind,
            EventKind::Started { .. } | EventKind::Stopped | EventKind::Error { .. }
        );

        match kind {
            EventKind::Started { pid, started_at } => {
                self.on_started(&id, &mut entry, pid, started_at, &timestamp);
            }
            EventKind::Stopped => {
                if matches!(
                    entry.status,
                    ProcessStatus::Running | ProcessStatus::Starting | ProcessStatus::Stopping
                ) {
                    entry.status = ProcessStatus::Stopped;
                    debug!(id = %id, "process stopped");
                }
                self.retire_pid(&id, &mut entry);
            }
            EventKind::Exit { exit_code } => {
                let line = self
                    .settings
                    .formatter
                    .notice_line(&exit_notice(exit_code), &timestamp);
                entry.output.push_line(line);

                if matches!(
                    entry.status,
                    ProcessStatus::Running | ProcessStatus::Starting | ProcessStatus::Stopping
                ) {
                    entry.status = ProcessStatus::Stopped;
                }
                self.retire_pid(&id, &mut entry);
                debug!(id = %id, ?exit_code, status = %entry.status, "process exited");
            }
            EventKind::Error { error } => {
                warn!(id = %id, error = %error, "process reported an error");
                entry.status = ProcessStatus::Error;
                entry.error_message = Some(error);
                self.retire_pid(&id, &mut entry);
            }
            EventKind::Output { stream, content } => {
                let line = self
                    .settings
                    .formatter
                    .output_line(stream, &content, &timestamp);
                entry.output.push_line(line);
            }
            EventKind::BrowserLaunched { url } => {
                let line = self
                    .settings
                    .formatter
                    .notice_line(&browser_launched_notice(&url), &timestamp);
                entry.output.push_line(line);
            }
            EventKind::BrowserLaunchFailed { url, reason } => {
                let notice = browser_failed_notice(url.as_deref(), &reason);
                let line = self.settings.formatter.notice_line(&notice, &timestamp);
                entry.output.push_line(line);
            }
        }

        let changed = appends_line || Lifecycle::of(&entry) != before;
        self.entries.insert(id.clone(), entry);
        if changed {
            self.dirty.insert(id);
        }
        changed
    }

    fn on_started(
        &mut self,
        id: &str,
        entry: &mut ProcessEntry,
        pid: Option<u32>,
        started_at: Option<String>,
        timestamp: &str,
    ) {
        match entry.status {
            ProcessStatus::Stopping => {
                // A stop is already on its way; the stop result or a
                // stopped/exit event settles this entry.
                debug!(id = %id, ?pid, "started event while stopping; waiting for stop to resolve");
            }
            _ if self.is_retired(id, pid) => {
                debug!(id = %id, ?pid, status = %entry.status, "ignoring stale started event for a retired pid");
            }
            _ if pid.is_none() => {
                // URL-only launches report `started` without a pid; the start
                // result rolls the entry back.
                debug!(id = %id, status = %entry.status, "started event without a pid; status unchanged");
            }
            _ => {
                entry.status = ProcessStatus::Running;
                entry.pid = pid;
                entry.started_at = started_at.or_else(|| Some(timestamp.to_string()));
                entry.error_message = None;
                self.pending.remove(id);
                debug!(id = %id, ?pid, "process running");
            }
        }
    }

    /// Decide whether an event for an id without an entry may create one,
    /// and create it if so.
    fn admit_unknown(&mut self, id: &str, kind: &EventKind) -> bool {
        let seed = match kind {
            EventKind::Stopped => {
                trace!(id = %id, "stopped event for an untracked id; nothing to record");
                return false;
            }
            EventKind::Started { pid: None, .. } => {
                trace!(id = %id, "started event without a pid for an untracked id; nothing to record");
                return false;
            }
            EventKind::Started { pid, .. } if self.is_retired(id, *pid) => {
                debug!(id = %id, ?pid, "ignoring stale started event for a retired pid");
                return false;
            }
            EventKind::Started { .. } => ProcessStatus::Starting,
            _ => ProcessStatus::Running,
        };

        if !self.known.contains(id) {
            match self.settings.unknown_ids {
                UnknownIdPolicy::Admit => {
                    debug!(id = %id, channel = %kind.channel(), "admitting event for unknown process id");
                }
                UnknownIdPolicy::Warn => {
                    warn!(id = %id, channel = %kind.channel(), "admitting event for unknown process id");
                }
                UnknownIdPolicy::Reject => {
                    warn!(id = %id, channel = %kind.channel(), "rejecting event for unknown process id");
                    return false;
                }
            }
        }

        self.entries.insert(
            id.to_string(),
            ProcessEntry::new(seed, self.settings.max_output_lines),
        );
        self.dirty.insert(id.to_string());
        true
    }

    /// Optimistic `starting` entry written before the start command is sent.
    ///
    /// Output already buffered for the id is kept; it may legitimately have
    /// arrived before this call.
    pub fn start_requested(&mut self, id: &str) -> bool {
        self.known.insert(id.to_string());

        let max_lines = self.settings.max_output_lines;
        let mut entry = self
            .entries
            .remove(id)
            .unwrap_or_else(|| ProcessEntry::new(ProcessStatus::Starting, max_lines));

        self.retire_pid(id, &mut entry);
        entry.status = ProcessStatus::Starting;
        entry.started_at = None;
        entry.error_message = None;

        self.entries.insert(id.to_string(), entry);
        self.dirty.insert(id.to_string());
        true
    }

    /// `start()` returned `pid`.
    ///
    /// Status is left to the `started` event. The pid is remembered so that a
    /// stop issued before that event still retires it.
    pub fn start_acknowledged(&mut self, id: &str, pid: u32) -> bool {
        let Some(entry) = self.entries.get(id) else {
            debug!(id = %id, pid, "start acknowledged for an entry that is gone; retiring pid");
            self.retired.insert(id.to_string(), pid);
            return false;
        };

        match entry.status {
            ProcessStatus::Starting => {
                if self.retired.get(id) == Some(&pid) {
                    self.retired.remove(id);
                }
                self.pending.insert(id.to_string(), pid);
            }
            ProcessStatus::Running => {
                trace!(id = %id, pid, "start acknowledged after its started event");
            }
            ProcessStatus::Stopping | ProcessStatus::Stopped | ProcessStatus::Error => {
                debug!(id = %id, pid, status = %entry.status, "start acknowledged after the process settled; retiring pid");
                self.retired.insert(id.to_string(), pid);
            }
        }
        false
    }

    /// Undo an optimistic start.
    ///
    /// Only applies while the entry is still `starting`: if an event has
    /// already moved it on, the event stream wins. An entry holding output
    /// is kept (as `error` on failure, `stopped` otherwise) instead of being
    /// deleted.
    pub fn start_rolled_back(&mut self, id: &str, error: Option<String>) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };

        if entry.status != ProcessStatus::Starting {
            debug!(id = %id, status = %entry.status, "start already settled by events; skipping rollback");
            return false;
        }

        if entry.output.is_empty() {
            self.entries.remove(id);
            debug!(id = %id, "rolled back optimistic start");
        } else {
            match error {
                Some(message) => {
                    entry.status = ProcessStatus::Error;
                    entry.error_message = Some(message);
                }
                None => entry.status = ProcessStatus::Stopped,
            }
            entry.pid = None;
            debug!(id = %id, status = %entry.status, "rolled back optimistic start, output kept");
        }

        self.dirty.insert(id.to_string());
        true
    }

    pub fn stop_requested(&mut self, id: &str) -> bool {
        let Some(mut entry) = self.entries.remove(id) else {
            debug!(id = %id, "stop requested for untracked id");
            return false;
        };

        entry.status = ProcessStatus::Stopping;
        self.retire_pid(id, &mut entry);
        self.entries.insert(id.to_string(), entry);
        self.dirty.insert(id.to_string());
        true
    }

    /// Stop succeeded. Ignored if the event stream already settled the entry.
    pub fn stop_succeeded(&mut self, id: &str) -> bool {
        let Some(mut entry) = self.entries.remove(id) else {
            return false;
        };

        let changed = !entry.status.is_terminal();
        if changed {
            entry.status = ProcessStatus::Stopped;
            self.retire_pid(id, &mut entry);
            self.dirty.insert(id.to_string());
        }
        self.entries.insert(id.to_string(), entry);
        changed
    }

    /// Stop failed. Only an entry still waiting on this stop becomes `error`.
    pub fn stop_failed(&mut self, id: &str, message: String) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };

        if entry.status != ProcessStatus::Stopping {
            debug!(id = %id, status = %entry.status, "stop failure arrived after events settled the process");
            return false;
        }

        entry.status = ProcessStatus::Error;
        entry.error_message = Some(message);
        self.dirty.insert(id.to_string());
        true
    }

    /// Merge a polled snapshot.
    ///
    /// Status, pid, start time, error and background flag come from the
    /// snapshot; the local output buffer always wins. Ids missing from the
    /// snapshot are left alone.
    pub fn merge_snapshot(&mut self, processes: HashMap<ProcessId, ProcessSnapshot>) -> bool {
        let mut changed = false;
        for (id, snapshot) in processes {
            changed |= self.merge_one(id, snapshot);
        }
        changed
    }

    pub fn merge_one(&mut self, id: ProcessId, snapshot: ProcessSnapshot) -> bool {
        self.known.insert(id.clone());

        let max_lines = self.settings.max_output_lines;
        let existed = self.entries.contains_key(&id);
        let mut entry = self
            .entries
            .remove(&id)
            .unwrap_or_else(|| ProcessEntry::new(snapshot.status, max_lines));
        let before = Lifecycle::of(&entry);

        let pid = match snapshot.status {
            ProcessStatus::Running => snapshot.pid,
            _ => None,
        };
        if let Some(old) = entry.pid.filter(|&old| pid != Some(old)) {
            self.retired.insert(id.clone(), old);
        }
        if let Some(pid) = pid {
            // The service reports it live, so it is neither pending nor stale.
            if self.pending.get(&id) == Some(&pid) {
                self.pending.remove(&id);
            }
            if self.retired.get(&id) == Some(&pid) {
                self.retired.remove(&id);
            }
        }

        entry.status = snapshot.status;
        entry.pid = pid;
        entry.started_at = snapshot.started_at;
        entry.error_message = match snapshot.status {
            ProcessStatus::Error => snapshot.error_message,
            _ => None,
        };
        if let Some(is_background) = snapshot.is_background {
            entry.is_background = is_background;
        }

        let changed = !existed || Lifecycle::of(&entry) != before;
        self.entries.insert(id.clone(), entry);
        if changed {
            self.dirty.insert(id);
        }
        changed
    }

    /// Drop a single id's buffered output without touching its status.
    pub fn clear_output(&mut self, id: &str) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if !entry.output.is_empty() => {
                entry.output.clear();
                self.dirty.insert(id.to_string());
                true
            }
            _ => false,
        }
    }

    /// Successful kill-all: forget every process and its output.
    ///
    /// Only the killed pids are remembered, so late `started` events for
    /// them stay stale. Known ids are forgotten too.
    pub fn kill_all(&mut self) -> bool {
        let changed = !self.entries.is_empty();

        let mut retired = HashMap::new();
        for (id, mut entry) in std::mem::take(self.entries) {
            let pending = self.pending.remove(&id);
            if let Some(pid) = entry.pid.take().or(pending) {
                retired.insert(id.clone(), pid);
            }
            self.dirty.insert(id);
        }

        *self.retired = retired;
        self.pending.clear();
        self.known.clear();
        changed
    }

    /// Move the entry's pid, or the acknowledged one still awaiting its
    /// `started` event, to `retired`.
    fn retire_pid(&mut self, id: &str, entry: &mut ProcessEntry) {
        let pending = self.pending.remove(id);
        if let Some(pid) = entry.pid.take().or(pending) {
            self.retired.insert(id.to_string(), pid);
        }
    }

    fn is_retired(&self, id: &str, pid: Option<u32>) -> bool {
        pid.is_some() && self.retired.get(id) == pid.as_ref()
    }
}

/// The fields of an entry that are not its output.
#[derive(PartialEq, Eq)]
struct Lifecycle {
    status: ProcessStatus,
    pid: Option<u32>,
    started_at: Option<String>,
    error_message: Option<String>,
    is_background: bool,
}

impl Lifecycle {
    fn of(entry: &ProcessEntry) -> Self {
        Self {
            status: entry.status,
            pid: entry.pid,
            started_at: entry.started_at.clone(),
            error_message: entry.error_message.clone(),
            is_background: entry.is_background,
        }
    }
}
