use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use procsync::errors::{Result, SyncError};
use procsync::events::EventChannel;
use procsync::subscriber::{EventHandler, EventSource, ListenerId, LocalEventBus};

/// An event source that:
/// - delivers through an inner [`LocalEventBus`]
/// - can be told to refuse registration on chosen channels
/// - counts `listen` / `unlisten` calls per channel
#[derive(Default)]
pub struct FakeEventBus {
    inner: LocalEventBus,
    failing: Mutex<HashSet<EventChannel>>,
    listens: Mutex<HashMap<EventChannel, usize>>,
    unlistens: Mutex<HashMap<EventChannel, usize>>,
}

impl FakeEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `listen` fail for `channel`.
    pub fn fail_channel(&self, channel: EventChannel) {
        self.failing.lock().unwrap().insert(channel);
    }

    pub fn emit(&self, channel: EventChannel, payload: serde_json::Value) -> usize {
        self.inner.emit(channel, payload)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }

    pub fn listens_on(&self, channel: EventChannel) -> usize {
        self.listens.lock().unwrap().get(&channel).copied().unwrap_or(0)
    }

    pub fn unlistens_on(&self, channel: EventChannel) -> usize {
        self.unlistens.lock().unwrap().get(&channel).copied().unwrap_or(0)
    }
}

impl EventSource for FakeEventBus {
    fn listen(&self, channel: EventChannel, handler: EventHandler) -> Result<ListenerId> {
        *self.listens.lock().unwrap().entry(channel).or_default() += 1;

        if self.failing.lock().unwrap().contains(&channel) {
            return Err(SyncError::Service(format!("cannot listen on {channel}")));
        }
        self.inner.listen(channel, handler)
    }

    fn unlisten(&self, channel: EventChannel, listener: ListenerId) {
        *self.unlistens.lock().unwrap().entry(channel).or_default() += 1;
        self.inner.unlisten(channel, listener);
    }
}
