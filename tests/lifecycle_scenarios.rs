// tests/lifecycle_scenarios.rs
mod common;
use crate::common::builders::{LaunchSpecBuilder, err_line, payload};
use crate::common::fake_bus::FakeEventBus;
use crate::common::fake_service::FakeProcessService;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;

use procsync::config::SyncConfig;
use procsync::events::EventChannel;
use procsync::gateway::CommandResult;
use procsync::subscriber::LocalEventBus;
use procsync::{ProcessStatus, ProcessSync};

type TestResult = Result<(), Box<dyn Error>>;

/// A sync wired to a fake service that publishes on the same bus.
async fn wired() -> Result<(ProcessSync, Arc<FakeProcessService>), Box<dyn Error>> {
    let local = Arc::new(LocalEventBus::new());
    let service = Arc::new(FakeProcessService::new().with_bus(local.clone()));
    let mut sync = ProcessSync::new(&SyncConfig::default(), service.clone(), local);
    sync.attach().await?;
    Ok((sync, service))
}

async fn attached() -> Result<(ProcessSync, Arc<FakeEventBus>), Box<dyn Error>> {
    let service = Arc::new(FakeProcessService::new());
    let bus = Arc::new(FakeEventBus::new());
    let mut sync = ProcessSync::new(&SyncConfig::default(), service, bus.clone());
    sync.attach().await?;
    Ok((sync, bus))
}

#[tokio::test]
async fn start_ack_then_started_event_gives_running_with_pid() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (sync, bus) = attached().await?;

        let result = sync
            .start_process("a", &LaunchSpecBuilder::new("serve").build())
            .await?;
        assert!(result.success);
        assert_eq!(result.pid, Some(100));

        bus.emit(EventChannel::ProcessStarted, payload::started("a", 100));
        sync.settle().await?;

        let view = sync.view();
        let a = view.get("a").ok_or("missing a")?;
        assert_eq!(a.status, ProcessStatus::Running);
        assert_eq!(a.pid, Some(100));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn stderr_for_unseen_id_creates_running_entry() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (sync, bus) = attached().await?;

        bus.emit(EventChannel::ProcessOutput, payload::stderr("b", "boom"));
        sync.settle().await?;

        let view = sync.view();
        let b = view.get("b").ok_or("missing b")?;
        assert_eq!(b.status, ProcessStatus::Running);
        assert_eq!(b.output, vec![err_line("boom")]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn exit_while_running_stops_and_appends_exit_line() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (sync, bus) = attached().await?;

        sync.start_process("a", &LaunchSpecBuilder::new("serve").build())
            .await?;
        bus.emit(EventChannel::ProcessStarted, payload::started("a", 100));
        bus.emit(EventChannel::ProcessExit, payload::exit("a", 1));
        sync.settle().await?;

        let view = sync.view();
        let a = view.get("a").ok_or("missing a")?;
        assert_eq!(a.status, ProcessStatus::Stopped);
        assert_eq!(a.pid, None);
        assert_eq!(
            a.output.last().map(String::as_str),
            Some("[12:34:56] Process exited with code 1")
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn start_then_stop_without_events_ends_terminal() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (sync, _bus) = attached().await?;

        sync.start_process("a", &LaunchSpecBuilder::new("serve").build())
            .await?;
        sync.stop_process("a").await?;
        sync.settle().await?;

        let status = sync.view().get("a").map(|s| s.status);
        assert!(status.is_some_and(|s| s.is_terminal()), "got {status:?}");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn concurrent_commands_on_different_ids_do_not_interfere() -> TestResult {
    with_timeout(async {
        init_tracing();
        let local = Arc::new(LocalEventBus::new());
        let service = Arc::new(FakeProcessService::new().with_bus(local.clone()));
        let mut sync = ProcessSync::new(&SyncConfig::default(), service, local);
        sync.attach().await?;

        let spec = LaunchSpecBuilder::new("serve").build();
        let (a, b, c) = tokio::join!(
            sync.start_process("a", &spec),
            sync.start_process("b", &spec),
            sync.start_process("c", &spec),
        );
        a?;
        b?;
        c?;
        sync.settle().await?;

        let view = sync.view();
        assert_eq!(view.len(), 3);
        assert!(!view.loading);
        let mut pids: Vec<u32> = view.processes.values().filter_map(|s| s.pid).collect();
        pids.sort_unstable();
        assert_eq!(pids, vec![100, 101, 102]);
        assert!(
            view.processes
                .values()
                .all(|s| s.status == ProcessStatus::Running)
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn started_event_delayed_past_stop_does_not_revive_process() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (sync, service) = wired().await?;
        service.hold_started_events();

        let spec = LaunchSpecBuilder::new("serve").build();
        let started = sync.start_process("a", &spec).await?;
        assert_eq!(started.pid, Some(100));
        sync.stop_process("a").await?;

        service.release_started_events();
        sync.settle().await?;

        let view = sync.view();
        let a = view.get("a").ok_or("missing a")?;
        assert_eq!(a.status, ProcessStatus::Stopped);
        assert_eq!(a.pid, None);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn bookmark_started_event_before_result_leaves_nothing_tracked() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (sync, service) = wired().await?;
        service.on_start("docs", CommandResult::ok("Opened http://localhost:8000"));

        let spec = LaunchSpecBuilder::bookmark("http://localhost:8000").build();
        let result = sync.start_process("docs", &spec).await?;
        assert!(result.success);
        assert_eq!(result.pid, None);
        sync.settle().await?;

        assert!(sync.view().get("docs").is_none());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn bookmark_started_event_after_result_leaves_nothing_tracked() -> TestResult {
    with_timeout(async {
        init_tracing();
        let (sync, service) = wired().await?;
        service.on_start("docs", CommandResult::ok("Opened http://localhost:8000"));
        service.hold_started_events();

        let spec = LaunchSpecBuilder::bookmark("http://localhost:8000").build();
        sync.start_process("docs", &spec).await?;
        service.release_started_events();
        sync.settle().await?;

        assert!(sync.view().is_empty());
        Ok(())
    })
    .await
}
