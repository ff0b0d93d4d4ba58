// src/subscriber/mod.rs

//! Event Subscriber and Subscription Lifecycle Manager.
//!
//! - [`source`] defines the [`EventSource`] trait: named push channels with
//!   register/unregister, as offered by the execution backend's event bus.
//! - [`bus`] is an in-process [`EventSource`] for embedding and replay.
//! - [`dispatch`] builds the per-channel handlers that decode payloads and
//!   forward them into the registry mailbox.
//! - [`lifecycle`] attaches and detaches those handlers exactly once per
//!   cycle, seeds state from a snapshot, and runs periodic reconciliation.

pub mod bus;
pub mod dispatch;
pub mod lifecycle;
pub mod source;

pub use bus::LocalEventBus;
pub use dispatch::EventDispatcher;
pub use lifecycle::{AttachReport, SubscriptionManager};
pub use source::{EventHandler, EventSource, ListenerId};
