// src/subscriber/dispatch.rs

//! Per-channel event handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace, warn};

use crate::engine::{RegistryHandle, RegistryMessage};
use crate::events::{EventChannel, decode};
use crate::subscriber::source::EventHandler;

/// Builds the handlers registered on each channel for one attach cycle.
///
/// Every handler checks the cycle's `attached` flag first, so anything
/// delivered after detach is dropped instead of mutating state.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    registry: RegistryHandle,
    attached: Arc<AtomicBool>,
}

impl EventDispatcher {
    pub fn new(registry: RegistryHandle, attached: Arc<AtomicBool>) -> Self {
        Self { registry, attached }
    }

    pub fn handler_for(&self, channel: EventChannel) -> EventHandler {
        let dispatcher = self.clone();
        Arc::new(move |payload| dispatcher.dispatch(channel, payload))
    }

    /// Decode one payload and queue it for the registry.
    pub fn dispatch(&self, channel: EventChannel, payload: serde_json::Value) {
        if !self.attached.load(Ordering::Acquire) {
            trace!(%channel, "event delivered after detach; dropping");
            return;
        }

        let event = match decode(channel, payload) {
            Ok(event) => event,
            Err(err) => {
                warn!(%channel, error = %err, "dropping malformed event payload");
                return;
            }
        };

        trace!(%channel, id = %event.id, "dispatching event");
        if self.registry.send(RegistryMessage::Event(event)).is_err() {
            debug!(%channel, "registry closed; event dropped");
        }
    }
}
