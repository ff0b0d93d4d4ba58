// src/output/format.rs

//! Formatting of buffered output lines.

use chrono::DateTime;

use crate::events::OutputStream;

/// Default rendering of the `[...]` timestamp prefix.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// Renders output chunks and synthetic notices into buffer lines.
#[derive(Debug, Clone)]
pub struct LineFormatter {
    timestamp_format: String,
}

impl LineFormatter {
    pub fn new(timestamp_format: impl Into<String>) -> Self {
        Self {
            timestamp_format: timestamp_format.into(),
        }
    }

    /// `[ts] content`, or `[ts] [ERR] content` for stderr.
    pub fn output_line(&self, stream: OutputStream, content: &str, timestamp: &str) -> String {
        let ts = self.render_timestamp(timestamp);
        match stream {
            OutputStream::Stdout => format!("[{ts}] {content}"),
            OutputStream::Stderr => format!("[{ts}] [ERR] {content}"),
        }
    }

    /// Synthetic informational line (exit codes, browser notices).
    pub fn notice_line(&self, content: &str, timestamp: &str) -> String {
        format!("[{}] {content}", self.render_timestamp(timestamp))
    }

    /// Timestamps are RFC 3339 on the wire and rendered in the offset they
    /// carry. Anything unparsable is shown verbatim.
    pub fn render_timestamp(&self, timestamp: &str) -> String {
        match DateTime::parse_from_rfc3339(timestamp) {
            Ok(dt) => dt.format(&self.timestamp_format).to_string(),
            Err(_) => timestamp.to_string(),
        }
    }
}

impl Default for LineFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_FORMAT)
    }
}

pub fn exit_notice(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("Process exited with code {code}"),
        None => "Process exited without an exit code".to_string(),
    }
}

pub fn browser_launched_notice(url: &str) -> String {
    format!("Browser launched: {url}")
}

pub fn browser_failed_notice(url: Option<&str>, reason: &str) -> String {
    match url {
        Some(url) => format!("Browser launch failed: {reason} ({url})"),
        None => format!("Browser launch failed: {reason}"),
    }
}
