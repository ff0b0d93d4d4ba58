// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod output;
pub mod replay;
pub mod subscriber;
pub mod types;

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::{SyncConfig, load_or_default};
use crate::replay::replay_events;

pub use crate::client::ProcessSync;
pub use crate::engine::RegistryView;
pub use crate::errors::SyncError;
pub use crate::types::{ProcessId, ProcessState, ProcessStatus};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the dry-run settings printout
/// - replay of a captured event log through the full pipeline
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let Some(events_path) = args.events else {
        anyhow::bail!("--events is required unless --dry-run is given");
    };

    let file = File::open(&events_path)
        .with_context(|| format!("opening event log {}", events_path.display()))?;
    let outcome = replay_events(&cfg, BufReader::new(file)).await?;

    let json = serde_json::to_string_pretty(&outcome.view.to_map())
        .context("serializing registry view")?;
    println!("{json}");

    if outcome.skipped > 0 {
        eprintln!("skipped {} invalid line(s)", outcome.skipped);
    }
    Ok(())
}

/// Print the effective settings without doing anything else.
fn print_dry_run(cfg: &SyncConfig) {
    println!("procsync dry-run");
    println!("  output.max_lines = {}", cfg.output.max_lines);
    println!("  output.timestamp_format = {:?}", cfg.output.timestamp_format);
    println!("  registry.unknown_ids = {:?}", cfg.registry.unknown_ids);
    match cfg.poll_interval() {
        Some(period) => println!("  subscription.poll_interval = {period:?}"),
        None => println!("  subscription.poll_interval = disabled"),
    }

    debug!("dry-run complete (nothing replayed)");
}
