use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::Notify;

use procsync::errors::SyncError;
use procsync::events::EventChannel;
use procsync::gateway::{CommandResult, LaunchSpec, ProcessService, ServiceFuture};
use procsync::subscriber::LocalEventBus;
use procsync::types::{ProcessId, ProcessSnapshot, ProcessStatus};

use crate::builders::{TS, payload};

#[derive(Default)]
struct FakeState {
    next_pid: u32,
    start_results: HashMap<ProcessId, VecDeque<CommandResult>>,
    stop_results: HashMap<ProcessId, VecDeque<CommandResult>>,
    kill_all_results: VecDeque<CommandResult>,
    processes: HashMap<ProcessId, ProcessSnapshot>,
    snapshots_fail: bool,
    /// `Some` while started events are held back.
    held_started: Option<Vec<Value>>,
    calls: Vec<String>,
}

/// A scripted process service that:
/// - records every call as `"op"` or `"op:id"`
/// - answers start with an incrementing pid (from 100) unless scripted
/// - answers stop/kill-all with success unless scripted
/// - reports a pid-less `process-started` for starts that return no pid
/// - tracks a process table for snapshot queries
/// - optionally publishes the backend's events on a [`LocalEventBus`]
pub struct FakeProcessService {
    state: Mutex<FakeState>,
    bus: Option<Arc<LocalEventBus>>,
    start_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeProcessService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_pid: 100,
                ..FakeState::default()
            }),
            bus: None,
            start_gate: Mutex::new(None),
        }
    }

    /// Publish `process-started` / `process-stopped` on `bus` the way the
    /// real backend does, before the command result is returned.
    pub fn with_bus(mut self, bus: Arc<LocalEventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Queue the result of the next `start(id)`.
    pub fn on_start(&self, id: &str, result: CommandResult) {
        let mut state = self.state.lock().unwrap();
        state
            .start_results
            .entry(id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Queue the result of the next `stop(id)`.
    pub fn on_stop(&self, id: &str, result: CommandResult) {
        let mut state = self.state.lock().unwrap();
        state
            .stop_results
            .entry(id.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn on_kill_all(&self, result: CommandResult) {
        self.state.lock().unwrap().kill_all_results.push_back(result);
    }

    /// Make the service report `id` in snapshots.
    pub fn insert_process(&self, id: &str, snapshot: ProcessSnapshot) {
        self.state
            .lock()
            .unwrap()
            .processes
            .insert(id.to_string(), snapshot);
    }

    /// Make snapshot queries fail at the transport level.
    pub fn fail_snapshots(&self, fail: bool) {
        self.state.lock().unwrap().snapshots_fail = fail;
    }

    /// Hold every `start` until the returned `Notify` is signalled once per
    /// held call.
    pub fn hold_starts(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.start_gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    /// Queue `process-started` events instead of publishing them, so they
    /// land after the command result.
    pub fn hold_started_events(&self) {
        let mut state = self.state.lock().unwrap();
        state.held_started.get_or_insert_with(Vec::new);
    }

    /// Publish every held `process-started` event, in order, and stop
    /// holding.
    pub fn release_started_events(&self) {
        let held = self.state.lock().unwrap().held_started.take();
        for payload in held.unwrap_or_default() {
            self.emit(EventChannel::ProcessStarted, payload);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn emit(&self, channel: EventChannel, payload: serde_json::Value) {
        if let Some(bus) = &self.bus {
            bus.emit(channel, payload);
        }
    }

    fn emit_started(&self, payload: Value) {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(held) = state.held_started.as_mut() {
                held.push(payload);
                return;
            }
        }
        self.emit(EventChannel::ProcessStarted, payload);
    }

    fn next_start_result(&self, id: &str) -> CommandResult {
        let mut state = self.state.lock().unwrap();
        if let Some(result) = state.start_results.get_mut(id).and_then(VecDeque::pop_front) {
            return result;
        }
        let pid = state.next_pid;
        state.next_pid += 1;
        CommandResult::started(pid)
    }
}

impl Default for FakeProcessService {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessService for FakeProcessService {
    fn start<'a>(&'a self, id: &'a str, _spec: &'a LaunchSpec) -> ServiceFuture<'a, CommandResult> {
        Box::pin(async move {
            self.record(format!("start:{id}"));

            let gate = self.start_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let result = self.next_start_result(id);
            match (result.success, result.pid) {
                (true, Some(pid)) => {
                    self.state
                        .lock()
                        .unwrap()
                        .processes
                        .insert(id.to_string(), ProcessSnapshot::running(pid, TS));
                    self.emit_started(payload::started(id, pid));
                }
                (true, None) => self.emit_started(payload::started_without_pid(id)),
                (false, _) => {}
            }
            Ok(result)
        })
    }

    fn stop<'a>(&'a self, id: &'a str) -> ServiceFuture<'a, CommandResult> {
        Box::pin(async move {
            self.record(format!("stop:{id}"));

            let result = {
                let mut state = self.state.lock().unwrap();
                state
                    .stop_results
                    .get_mut(id)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_else(|| CommandResult::ok("Process stopped"))
            };

            if result.success {
                self.state.lock().unwrap().processes.remove(id);
                self.emit(EventChannel::ProcessStopped, payload::stopped(id));
            }
            Ok(result)
        })
    }

    fn get_all_processes(&self) -> ServiceFuture<'_, HashMap<ProcessId, ProcessSnapshot>> {
        Box::pin(async move {
            self.record("get_all_processes".to_string());
            let state = self.state.lock().unwrap();
            if state.snapshots_fail {
                return Err(SyncError::Service("connection refused".to_string()));
            }
            Ok(state.processes.clone())
        })
    }

    fn get_process_status<'a>(&'a self, id: &'a str) -> ServiceFuture<'a, Option<ProcessSnapshot>> {
        Box::pin(async move {
            self.record(format!("get_process_status:{id}"));
            let state = self.state.lock().unwrap();
            if state.snapshots_fail {
                return Err(SyncError::Service("connection refused".to_string()));
            }
            Ok(state.processes.get(id).cloned())
        })
    }

    fn kill_all(&self) -> ServiceFuture<'_, CommandResult> {
        Box::pin(async move {
            self.record("kill_all".to_string());

            let result = self
                .state
                .lock()
                .unwrap()
                .kill_all_results
                .pop_front()
                .unwrap_or_else(|| CommandResult::ok("All processes killed"));

            if result.success {
                let killed: Vec<ProcessId> = {
                    let mut state = self.state.lock().unwrap();
                    state.processes.drain().map(|(id, _)| id).collect()
                };
                for id in killed {
                    self.emit(EventChannel::ProcessStopped, payload::stopped(&id));
                }
            }
            Ok(result)
        })
    }
}

/// Snapshot helper for a stopped process.
pub fn stopped_snapshot() -> ProcessSnapshot {
    ProcessSnapshot {
        status: ProcessStatus::Stopped,
        ..ProcessSnapshot::default()
    }
}
