// src/subscriber/source.rs

use std::sync::Arc;

use crate::errors::Result;
use crate::events::EventChannel;

/// Identifies one registered handler on an [`EventSource`].
pub type ListenerId = u64;

/// Callback invoked with the raw JSON payload of each event.
///
/// Handlers are fire-and-forget: they must return quickly and never block
/// the publisher.
pub type EventHandler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Push-event stream of the execution service.
///
/// Delivery is at-most-once with no ordering guarantee between channels.
pub trait EventSource: Send + Sync {
    /// Register `handler` on `channel`.
    fn listen(&self, channel: EventChannel, handler: EventHandler) -> Result<ListenerId>;

    /// Remove a handler previously returned by [`EventSource::listen`].
    /// Unknown ids are ignored.
    fn unlisten(&self, channel: EventChannel, listener: ListenerId);
}
