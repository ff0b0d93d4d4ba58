// src/subscriber/bus.rs

//! In-process event bus.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::errors::Result;
use crate::events::EventChannel;
use crate::subscriber::source::{EventHandler, EventSource, ListenerId};

#[derive(Default)]
struct BusInner {
    next_id: ListenerId,
    listeners: HashMap<EventChannel, Vec<(ListenerId, EventHandler)>>,
}

/// [`EventSource`] whose events are published from the same process.
///
/// Used when the execution backend is embedded, and by the replay command.
#[derive(Default)]
pub struct LocalEventBus {
    inner: Mutex<BusInner>,
}

impl fmt::Debug for LocalEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every handler on `channel`. Returns how many
    /// handlers were called.
    pub fn emit(&self, channel: EventChannel, payload: serde_json::Value) -> usize {
        // Handlers run outside the lock so they may (un)register freely.
        let handlers: Vec<EventHandler> = self
            .lock()
            .listeners
            .get(&channel)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        trace!(%channel, handlers = handlers.len(), "emitting event");
        for handler in &handlers {
            handler(payload.clone());
        }
        handlers.len()
    }

    /// Total number of registered handlers across all channels.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.values().map(Vec::len).sum()
    }

    pub fn listeners_on(&self, channel: EventChannel) -> usize {
        self.lock().listeners.get(&channel).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSource for LocalEventBus {
    fn listen(&self, channel: EventChannel, handler: EventHandler) -> Result<ListenerId> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.entry(channel).or_default().push((id, handler));
        Ok(id)
    }

    fn unlisten(&self, channel: EventChannel, listener: ListenerId) {
        let mut inner = self.lock();
        if let Some(list) = inner.listeners.get_mut(&channel) {
            list.retain(|(id, _)| *id != listener);
        }
    }
}
