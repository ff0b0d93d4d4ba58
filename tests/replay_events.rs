// tests/replay_events.rs
mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use procsync::ProcessStatus;
use procsync::cli::CliArgs;
use procsync::config::{SyncConfig, load_and_validate};
use procsync::replay::replay_events;
use procsync::types::UnknownIdPolicy;

type TestResult = Result<(), Box<dyn Error>>;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

#[tokio::test]
async fn demo_event_log_replays_into_expected_registry() -> TestResult {
    with_timeout(async {
        init_tracing();
        let cfg = load_and_validate(demo("Procsync.toml"))?;
        assert_eq!(cfg.output.max_lines, 500);

        let file = File::open(demo("events.jsonl"))?;
        let outcome = replay_events(&cfg, BufReader::new(file)).await?;
        assert_eq!(outcome.applied, 10);
        assert_eq!(outcome.skipped, 1);

        let view = outcome.view;
        assert_eq!(view.len(), 3);
        assert!(view.get("ghost").is_none());

        let web = view.get("web").ok_or("missing web")?;
        assert_eq!(web.status, ProcessStatus::Running);
        assert_eq!(web.pid, Some(4100));
        assert_eq!(
            web.output,
            vec![
                "[09:00:00] > vite".to_string(),
                "[09:00:02] ready on http://localhost:5173".to_string(),
                "[09:00:03] Browser launched: http://localhost:5173".to_string(),
            ]
        );

        let build = view.get("build").ok_or("missing build")?;
        assert_eq!(build.status, ProcessStatus::Stopped);
        assert_eq!(build.pid, None);
        assert_eq!(build.started_at.as_deref(), Some("2024-05-01T09:01:00+00:00"));
        assert_eq!(
            build.output,
            vec![
                "[09:01:05] [ERR] error[E0425]: cannot find value".to_string(),
                "[09:01:06] Process exited with code 101".to_string(),
            ]
        );

        let docs = view.get("docs").ok_or("missing docs")?;
        assert_eq!(
            docs.output,
            vec!["[09:03:00] Browser launch failed: no default browser (http://localhost:8000)"
                .to_string()]
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn reject_policy_replay_keeps_nothing_without_known_ids() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut cfg = SyncConfig::default();
        cfg.registry.unknown_ids = UnknownIdPolicy::Reject;

        let file = File::open(demo("events.jsonl"))?;
        let outcome = replay_events(&cfg, BufReader::new(file)).await?;

        assert_eq!(outcome.applied, 10);
        assert!(outcome.view.is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn replay_uses_configured_timestamp_format() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut cfg = SyncConfig::default();
        cfg.output.timestamp_format = "%d/%m %H:%M".to_string();

        let log = br#"{"channel":"process-output","payload":{"id":"x","stream":"stdout","content":"hi","timestamp":"2024-05-01T23:59:30-07:00"}}"#;
        let outcome = replay_events(&cfg, &log[..]).await?;

        let x = outcome.view.get("x").ok_or("missing x")?;
        assert_eq!(x.output, vec!["[01/05 23:59] hi".to_string()]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn dry_run_validates_config_and_returns() -> TestResult {
    with_timeout(async {
        init_tracing();
        let args = CliArgs {
            config: Some(demo("Procsync.toml")),
            events: None,
            log_level: None,
            dry_run: true,
        };
        procsync::run(args).await?;
        Ok(())
    })
    .await
}
