// src/logging.rs

//! Tracing subscriber setup.
//!
//! The filter comes from `--log-level` when given, otherwise from
//! `PROCSYNC_LOG`, which takes either a bare level (`debug`, `warning`) or
//! full `EnvFilter` directives (`procsync::engine=trace,info`). Anything
//! unreadable falls back to `info`.
//!
//! Output goes to stderr; stdout carries the replayed registry.

use anyhow::Result;
use clap::ValueEnum;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Environment variable read when no CLI level is given.
pub const LOG_ENV: &str = "PROCSYNC_LOG";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = filter_for(cli_level, env_value.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    Ok(())
}

/// Filter for a CLI level and a raw `PROCSYNC_LOG` value, CLI first.
pub fn filter_for(cli_level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return only(level.into());
    }

    let Some(raw) = env_value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return only(Level::INFO);
    };
    match parse_level_str(raw) {
        Some(level) => only(level),
        None => EnvFilter::try_new(raw).unwrap_or_else(|_| only(Level::INFO)),
    }
}

/// Parse a bare level name, case-insensitively, with the CLI's aliases.
pub fn parse_level_str(s: &str) -> Option<Level> {
    LogLevel::from_str(s.trim(), true).ok().map(Level::from)
}

fn only(level: Level) -> EnvFilter {
    EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
}
