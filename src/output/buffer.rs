// src/output/buffer.rs

//! Bounded, evicting log of output lines.

use std::collections::VecDeque;

/// Lines kept per process unless configured otherwise.
pub const DEFAULT_MAX_LINES: usize = 1000;

/// FIFO of formatted lines capped at `max_lines`.
///
/// Once full, every push evicts the oldest line, so the buffer always holds
/// the most recent `max_lines` lines in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
}

impl OutputBuffer {
    /// `max_lines` is clamped to at least 1.
    pub fn new(max_lines: usize) -> Self {
        let max_lines = max_lines.max(1);
        Self {
            lines: VecDeque::new(),
            max_lines,
        }
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        while self.lines.len() >= self.max_lines {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn lines(&self) -> impl Iterator<Item = &String> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Copy of the lines, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}
