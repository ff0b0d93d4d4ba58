// src/events/mod.rs

//! Push events published by the process execution service.
//!
//! - [`channel`] names the seven event channels a subscriber listens on.
//! - [`wire`] holds the decoded [`ProcessEvent`] type and the per-channel
//!   payload decoding, tolerant of the field spellings the backend uses.

pub mod channel;
pub mod wire;

pub use channel::EventChannel;
pub use wire::{EventEnvelope, EventKind, OutputStream, ProcessEvent, decode};
