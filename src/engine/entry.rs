// src/engine/entry.rs

//! Internal per-process record.

use crate::output::OutputBuffer;
use crate::types::{ProcessState, ProcessStatus};

/// Registry-side state of one process.
///
/// Unlike [`ProcessState`], the output lives in a bounded [`OutputBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: Option<u32>,
    pub status: ProcessStatus,
    pub started_at: Option<String>,
    pub error_message: Option<String>,
    pub output: OutputBuffer,
    pub is_background: bool,
}

impl ProcessEntry {
    pub fn new(status: ProcessStatus, max_lines: usize) -> Self {
        Self {
            pid: None,
            status,
            started_at: None,
            error_message: None,
            output: OutputBuffer::new(max_lines),
            is_background: false,
        }
    }

    pub fn to_state(&self) -> ProcessState {
        ProcessState {
            pid: self.pid,
            status: self.status,
            started_at: self.started_at.clone(),
            error_message: self.error_message.clone(),
            output: self.output.to_vec(),
            is_background: self.is_background,
        }
    }
}
