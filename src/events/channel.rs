// src/events/channel.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named push-event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventChannel {
    ProcessStarted,
    ProcessStopped,
    ProcessExit,
    ProcessError,
    ProcessOutput,
    BrowserLaunched,
    BrowserLaunchFailed,
}

impl EventChannel {
    /// Every channel, in the order a subscriber registers them.
    pub const ALL: [EventChannel; 7] = [
        EventChannel::ProcessStarted,
        EventChannel::ProcessStopped,
        EventChannel::ProcessExit,
        EventChannel::ProcessError,
        EventChannel::ProcessOutput,
        EventChannel::BrowserLaunched,
        EventChannel::BrowserLaunchFailed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventChannel::ProcessStarted => "process-started",
            EventChannel::ProcessStopped => "process-stopped",
            EventChannel::ProcessExit => "process-exit",
            EventChannel::ProcessError => "process-error",
            EventChannel::ProcessOutput => "process-output",
            EventChannel::BrowserLaunched => "browser-launched",
            EventChannel::BrowserLaunchFailed => "browser-launch-failed",
        }
    }
}

impl fmt::Display for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        EventChannel::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown event channel: {s}"))
    }
}
