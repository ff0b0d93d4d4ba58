// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::output::DEFAULT_MAX_LINES;
use crate::output::format::DEFAULT_TIMESTAMP_FORMAT;
use crate::types::UnknownIdPolicy;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [output]
/// max_lines = 1000
/// timestamp_format = "%H:%M:%S"
///
/// [registry]
/// unknown_ids = "warn"
///
/// [subscription]
/// poll_interval_ms = 5000
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSyncConfig {
    #[serde(default)]
    pub output: OutputSection,

    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub subscription: SubscriptionSection,
}

/// Validated configuration. Build one with `SyncConfig::try_from(raw)` or
/// [`SyncConfig::default`].
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    pub output: OutputSection,
    pub registry: RegistrySection,
    pub subscription: SubscriptionSection,
}

impl SyncConfig {
    pub(crate) fn new_unchecked(raw: RawSyncConfig) -> Self {
        Self {
            output: raw.output,
            registry: raw.registry,
            subscription: raw.subscription,
        }
    }

    /// Period of the background snapshot poll, or `None` if disabled.
    pub fn poll_interval(&self) -> Option<Duration> {
        match self.subscription.poll_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    /// Lines kept per process before the oldest are evicted.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// `chrono` strftime format for the `[...]` prefix of each line.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

/// `[registry]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrySection {
    /// `"admit"`, `"warn"` (default) or `"reject"`.
    #[serde(default)]
    pub unknown_ids: UnknownIdPolicy,
}

/// `[subscription]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionSection {
    /// Milliseconds between background snapshot polls; `0` disables them.
    #[serde(default)]
    pub poll_interval_ms: u64,
}
