#![allow(dead_code)]

use std::collections::HashMap;

use serde_json::{Value, json};

use procsync::events::{EventKind, OutputStream, ProcessEvent};
use procsync::gateway::LaunchSpec;

/// Fixed timestamp used by every builder; renders as `12:34:56`.
pub const TS: &str = "2024-05-01T12:34:56+00:00";

/// `[12:34:56]` prefix produced for lines stamped with [`TS`].
pub const TS_PREFIX: &str = "[12:34:56]";

/// Raw JSON payloads, shaped the way the backend publishes them.
pub mod payload {
    use super::*;

    pub fn started(id: &str, pid: u32) -> Value {
        json!({ "id": id, "pid": pid, "startedAt": TS, "timestamp": TS })
    }

    /// What a URL-only launch reports: no pid, no start time.
    pub fn started_without_pid(id: &str) -> Value {
        json!({ "id": id, "message": "Bookmark opened", "timestamp": TS })
    }

    pub fn stopped(id: &str) -> Value {
        json!({ "id": id, "timestamp": TS })
    }

    pub fn exit(id: &str, code: i32) -> Value {
        json!({ "id": id, "exitCode": code, "timestamp": TS })
    }

    pub fn error(id: &str, error: &str) -> Value {
        json!({ "id": id, "error": error, "timestamp": TS })
    }

    pub fn stdout(id: &str, content: &str) -> Value {
        json!({ "id": id, "stream": "stdout", "content": content, "timestamp": TS })
    }

    pub fn stderr(id: &str, content: &str) -> Value {
        json!({ "id": id, "stream": "stderr", "content": content, "timestamp": TS })
    }

    pub fn browser_launched(id: &str, url: &str) -> Value {
        json!({ "id": id, "url": url, "timestamp": TS })
    }

    pub fn browser_launch_failed(id: &str, url: &str, reason: &str) -> Value {
        json!({ "id": id, "url": url, "reason": reason, "timestamp": TS })
    }
}

/// Decoded events, for driving the core registry directly.
pub mod event {
    use super::*;

    pub fn started(id: &str, pid: u32) -> ProcessEvent {
        ProcessEvent::new(
            id,
            TS,
            EventKind::Started {
                pid: Some(pid),
                started_at: Some(TS.to_string()),
            },
        )
    }

    /// URL-only launches report `started` with no pid.
    pub fn started_without_pid(id: &str) -> ProcessEvent {
        ProcessEvent::new(
            id,
            TS,
            EventKind::Started {
                pid: None,
                started_at: None,
            },
        )
    }

    pub fn stopped(id: &str) -> ProcessEvent {
        ProcessEvent::new(id, TS, EventKind::Stopped)
    }

    pub fn exit(id: &str, code: i32) -> ProcessEvent {
        ProcessEvent::new(id, TS, EventKind::Exit { exit_code: Some(code) })
    }

    pub fn error(id: &str, error: &str) -> ProcessEvent {
        ProcessEvent::new(
            id,
            TS,
            EventKind::Error {
                error: error.to_string(),
            },
        )
    }

    pub fn stdout(id: &str, content: &str) -> ProcessEvent {
        ProcessEvent::new(
            id,
            TS,
            EventKind::Output {
                stream: OutputStream::Stdout,
                content: content.to_string(),
            },
        )
    }

    pub fn stderr(id: &str, content: &str) -> ProcessEvent {
        ProcessEvent::new(
            id,
            TS,
            EventKind::Output {
                stream: OutputStream::Stderr,
                content: content.to_string(),
            },
        )
    }
}

/// Expected buffer line for stdout `content` stamped with [`TS`].
pub fn line(content: &str) -> String {
    format!("{TS_PREFIX} {content}")
}

/// Expected buffer line for stderr `content` stamped with [`TS`].
pub fn err_line(content: &str) -> String {
    format!("{TS_PREFIX} [ERR] {content}")
}

/// Builder for `LaunchSpec`.
pub struct LaunchSpecBuilder {
    spec: LaunchSpec,
}

impl LaunchSpecBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            spec: LaunchSpec::command(cmd),
        }
    }

    /// URL-only launch with no command.
    pub fn bookmark(url: &str) -> Self {
        Self {
            spec: LaunchSpec {
                url: Some(url.to_string()),
                ..LaunchSpec::default()
            },
        }
    }

    pub fn working_directory(mut self, dir: &str) -> Self {
        self.spec.working_directory = Some(dir.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.spec
            .environment_variables
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.spec.url = Some(url.to_string());
        self
    }

    pub fn port_to_check(mut self, port: u16) -> Self {
        self.spec.port_to_check = Some(port);
        self
    }

    pub fn build(self) -> LaunchSpec {
        self.spec
    }
}
