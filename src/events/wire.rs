// src/events/wire.rs

//! Wire-level event payloads and their decoding into [`ProcessEvent`].
//!
//! The backend is not consistent about field names: the process id arrives
//! as `id` or `appId`, the output stream as `stream` or `type`, and error
//! text as `error` or `message`. All spellings are accepted here so the rest
//! of the crate only ever sees one shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::events::EventChannel;
use crate::types::ProcessId;

/// Which pipe an output chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One decoded push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEvent {
    pub id: ProcessId,
    /// RFC 3339; filled with the receive time when the backend omits it.
    pub timestamp: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Started {
        pid: Option<u32>,
        started_at: Option<String>,
    },
    Stopped,
    Exit {
        exit_code: Option<i32>,
    },
    Error {
        error: String,
    },
    Output {
        stream: OutputStream,
        content: String,
    },
    BrowserLaunched {
        url: String,
    },
    BrowserLaunchFailed {
        url: Option<String>,
        reason: String,
    },
}

impl EventKind {
    pub fn channel(&self) -> EventChannel {
        match self {
            EventKind::Started { .. } => EventChannel::ProcessStarted,
            EventKind::Stopped => EventChannel::ProcessStopped,
            EventKind::Exit { .. } => EventChannel::ProcessExit,
            EventKind::Error { .. } => EventChannel::ProcessError,
            EventKind::Output { .. } => EventChannel::ProcessOutput,
            EventKind::BrowserLaunched { .. } => EventChannel::BrowserLaunched,
            EventKind::BrowserLaunchFailed { .. } => EventChannel::BrowserLaunchFailed,
        }
    }
}

impl ProcessEvent {
    pub fn new(id: impl Into<ProcessId>, timestamp: impl Into<String>, kind: EventKind) -> Self {
        Self {
            id: id.into(),
            timestamp: timestamp.into(),
            kind,
        }
    }

    pub fn channel(&self) -> EventChannel {
        self.kind.channel()
    }
}

/// A channel name plus its raw payload, as captured in replay logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub channel: EventChannel,
    pub payload: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartedPayload {
    #[serde(alias = "appId")]
    id: String,
    #[serde(default)]
    pid: Option<u32>,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdOnlyPayload {
    #[serde(alias = "appId")]
    id: String,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExitPayload {
    #[serde(alias = "appId")]
    id: String,
    #[serde(default)]
    exit_code: Option<i32>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorPayload {
    #[serde(alias = "appId")]
    id: String,
    #[serde(alias = "message")]
    error: String,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputPayload {
    #[serde(alias = "appId")]
    id: String,
    #[serde(alias = "type")]
    stream: OutputStream,
    content: String,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowserLaunchedPayload {
    #[serde(alias = "appId")]
    id: String,
    url: String,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowserLaunchFailedPayload {
    #[serde(alias = "appId")]
    id: String,
    #[serde(default)]
    url: Option<String>,
    reason: String,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Decode a raw payload received on `channel`.
pub fn decode(channel: EventChannel, payload: serde_json::Value) -> Result<ProcessEvent> {
    let event = match channel {
        EventChannel::ProcessStarted => {
            let p: StartedPayload = parse(payload)?;
            ProcessEvent::new(
                p.id,
                stamp(p.timestamp),
                EventKind::Started {
                    pid: p.pid,
                    started_at: p.started_at,
                },
            )
        }
        EventChannel::ProcessStopped => {
            let p: IdOnlyPayload = parse(payload)?;
            ProcessEvent::new(p.id, stamp(p.timestamp), EventKind::Stopped)
        }
        EventChannel::ProcessExit => {
            let p: ExitPayload = parse(payload)?;
            ProcessEvent::new(
                p.id,
                stamp(p.timestamp),
                EventKind::Exit {
                    exit_code: p.exit_code,
                },
            )
        }
        EventChannel::ProcessError => {
            let p: ErrorPayload = parse(payload)?;
            ProcessEvent::new(p.id, stamp(p.timestamp), EventKind::Error { error: p.error })
        }
        EventChannel::ProcessOutput => {
            let p: OutputPayload = parse(payload)?;
            ProcessEvent::new(
                p.id,
                stamp(p.timestamp),
                EventKind::Output {
                    stream: p.stream,
                    content: p.content,
                },
            )
        }
        EventChannel::BrowserLaunched => {
            let p: BrowserLaunchedPayload = parse(payload)?;
            ProcessEvent::new(p.id, stamp(p.timestamp), EventKind::BrowserLaunched { url: p.url })
        }
        EventChannel::BrowserLaunchFailed => {
            let p: BrowserLaunchFailedPayload = parse(payload)?;
            ProcessEvent::new(
                p.id,
                stamp(p.timestamp),
                EventKind::BrowserLaunchFailed {
                    url: p.url,
                    reason: p.reason,
                },
            )
        }
    };

    Ok(event)
}

fn parse<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(payload)?)
}

fn stamp(timestamp: Option<String>) -> String {
    timestamp.unwrap_or_else(|| chrono::Utc::now().to_rfc3339())
}
