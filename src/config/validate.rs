// src/config/validate.rs

use chrono::format::{Item, StrftimeItems};

use crate::config::model::{RawSyncConfig, SyncConfig};
use crate::errors::{Result, SyncError};

/// Shortest accepted background poll period.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

impl TryFrom<RawSyncConfig> for SyncConfig {
    type Error = SyncError;

    fn try_from(raw: RawSyncConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(SyncConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawSyncConfig) -> Result<()> {
    validate_output(cfg)?;
    validate_subscription(cfg)?;
    Ok(())
}

fn validate_output(cfg: &RawSyncConfig) -> Result<()> {
    if cfg.output.max_lines == 0 {
        return Err(SyncError::ConfigError(
            "[output].max_lines must be >= 1 (got 0)".to_string(),
        ));
    }

    let format = &cfg.output.timestamp_format;
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(SyncError::ConfigError(format!(
            "[output].timestamp_format is not a valid strftime format: {format:?}"
        )));
    }

    Ok(())
}

fn validate_subscription(cfg: &RawSyncConfig) -> Result<()> {
    let ms = cfg.subscription.poll_interval_ms;
    if ms != 0 && ms < MIN_POLL_INTERVAL_MS {
        return Err(SyncError::ConfigError(format!(
            "[subscription].poll_interval_ms must be 0 (disabled) or >= {MIN_POLL_INTERVAL_MS} (got {ms})"
        )));
    }
    Ok(())
}
