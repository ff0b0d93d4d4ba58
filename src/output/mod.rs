// src/output/mod.rs

//! Per-process output buffering.
//!
//! - [`buffer`] holds the bounded FIFO of formatted lines kept per process.
//! - [`format`] turns output chunks and informational notices into the
//!   `[HH:MM:SS] [ERR]? content` lines stored in those buffers.

pub mod buffer;
pub mod format;

pub use buffer::{DEFAULT_MAX_LINES, OutputBuffer};
pub use format::LineFormatter;
