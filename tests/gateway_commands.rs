// tests/gateway_commands.rs
mod common;
use crate::common::builders::{LaunchSpecBuilder, TS};
use crate::common::fake_service::FakeProcessService;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;

use procsync::engine::{CoreRegistry, RegistryActor, RegistryHandle, RegistryMessage};
use procsync::errors::{Operation, SyncError};
use procsync::gateway::{CommandGateway, CommandResult};
use procsync::types::{ProcessSnapshot, ProcessStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn setup(service: Arc<FakeProcessService>) -> (RegistryHandle, CommandGateway) {
    let registry = RegistryActor::spawn(CoreRegistry::default());
    let gateway = CommandGateway::new(registry.clone(), service);
    (registry, gateway)
}

#[tokio::test]
async fn start_is_optimistic_and_waits_for_started_event() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        let (registry, gateway) = setup(service.clone());

        let result = gateway
            .start("web", &LaunchSpecBuilder::new("npm run dev").build())
            .await?;
        assert!(result.success);
        assert_eq!(result.pid, Some(100));

        registry.flush().await?;
        let view = registry.snapshot();
        let web = view.get("web").ok_or("missing web")?;
        assert_eq!(web.status, ProcessStatus::Starting);
        assert_eq!(web.pid, None);
        assert!(!view.loading);
        assert!(view.error.is_none());

        assert_eq!(service.calls(), vec!["start:web".to_string()]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn loading_is_set_while_start_is_in_flight() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        let gate = service.hold_starts();
        let (registry, gateway) = setup(service.clone());
        let mut rx = registry.subscribe();

        let spec = LaunchSpecBuilder::new("sleep 60").build();
        let task = tokio::spawn(async move { gateway.start("slow", &spec).await });

        rx.wait_for(|view| {
            view.loading && view.get("slow").map(|s| s.status) == Some(ProcessStatus::Starting)
        })
        .await?;

        gate.notify_one();
        task.await??;

        registry.flush().await?;
        assert!(!registry.snapshot().loading);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failed_start_rolls_back_and_reports() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        service.on_start("api", CommandResult::failed("command not found"));
        let (registry, gateway) = setup(service.clone());

        let err = gateway
            .start("api", &LaunchSpecBuilder::new("nope").build())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::CommandFailed {
                operation: Operation::Start,
                ..
            }
        ));
        assert_eq!(err.to_string(), "start failed: command not found");

        registry.flush().await?;
        let view = registry.snapshot();
        assert!(view.get("api").is_none());
        assert_eq!(
            view.error.as_deref(),
            Some("Failed to start 'api': command not found")
        );
        assert!(!view.loading);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn bookmark_launch_without_pid_leaves_nothing_tracked() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        service.on_start("docs", CommandResult::ok("Opened http://localhost:8000"));
        let (registry, gateway) = setup(service);

        let spec = LaunchSpecBuilder::bookmark("http://localhost:8000").build();
        let result = gateway.start("docs", &spec).await?;
        assert!(result.success);
        assert_eq!(result.pid, None);

        registry.flush().await?;
        let view = registry.snapshot();
        assert!(view.get("docs").is_none());
        assert!(view.error.is_none());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn next_command_clears_previous_error() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        service.on_start("api", CommandResult::failed("boom"));
        let (registry, gateway) = setup(service);
        let spec = LaunchSpecBuilder::new("run").build();

        assert!(gateway.start("api", &spec).await.is_err());
        registry.flush().await?;
        assert!(registry.snapshot().error.is_some());

        gateway.start("api", &spec).await?;
        registry.flush().await?;
        assert!(registry.snapshot().error.is_none());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn stop_success_marks_stopped() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        let (registry, gateway) = setup(service.clone());

        gateway
            .start("web", &LaunchSpecBuilder::new("serve").build())
            .await?;
        let result = gateway.stop("web").await?;
        assert!(result.success);

        registry.flush().await?;
        let view = registry.snapshot();
        assert_eq!(
            view.get("web").map(|s| s.status),
            Some(ProcessStatus::Stopped)
        );
        assert_eq!(
            service.calls(),
            vec!["start:web".to_string(), "stop:web".to_string()]
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn stop_failure_marks_error_and_reports() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        service.on_stop("web", CommandResult::failed("access denied"));
        let (registry, gateway) = setup(service);

        gateway
            .start("web", &LaunchSpecBuilder::new("serve").build())
            .await?;
        let err = gateway.stop("web").await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::CommandFailed {
                operation: Operation::Stop,
                ..
            }
        ));

        registry.flush().await?;
        let view = registry.snapshot();
        let web = view.get("web").ok_or("missing web")?;
        assert_eq!(web.status, ProcessStatus::Error);
        assert_eq!(web.error_message.as_deref(), Some("access denied"));
        assert_eq!(
            view.error.as_deref(),
            Some("Failed to stop 'web': access denied")
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn kill_all_success_empties_registry() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        let (registry, gateway) = setup(service);
        let spec = LaunchSpecBuilder::new("serve").build();

        gateway.start("a", &spec).await?;
        gateway.start("b", &spec).await?;
        gateway.kill_all().await?;

        registry.flush().await?;
        assert!(registry.snapshot().is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn kill_all_failure_keeps_registry() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        service.on_kill_all(CommandResult::failed("partial failure"));
        let (registry, gateway) = setup(service);

        gateway
            .start("a", &LaunchSpecBuilder::new("serve").build())
            .await?;
        let err = gateway.kill_all().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::CommandFailed {
                operation: Operation::KillAll,
                id: None,
                ..
            }
        ));

        registry.flush().await?;
        let view = registry.snapshot();
        assert_eq!(view.len(), 1);
        assert_eq!(
            view.error.as_deref(),
            Some("Failed to kill-all: partial failure")
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn get_all_processes_returns_merged_view_with_local_output() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        service.insert_process("web", ProcessSnapshot::running(321, TS));
        let (registry, gateway) = setup(service);

        registry.send(RegistryMessage::StartRequested { id: "web".into() })?;
        registry.send(RegistryMessage::Event(
            crate::common::builders::event::stdout("web", "ready"),
        ))?;

        let all = gateway.get_all_processes().await?;
        let web = all.get("web").ok_or("missing web")?;
        assert_eq!(web.status, ProcessStatus::Running);
        assert_eq!(web.pid, Some(321));
        assert_eq!(web.output, vec![crate::common::builders::line("ready")]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn snapshot_failure_reports_and_keeps_local_state() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        let (registry, gateway) = setup(service.clone());

        gateway
            .start("web", &LaunchSpecBuilder::new("serve").build())
            .await?;
        service.fail_snapshots(true);

        let err = gateway.get_all_processes().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::CommandFailed {
                operation: Operation::GetAllProcesses,
                ..
            }
        ));

        registry.flush().await?;
        let view = registry.snapshot();
        assert_eq!(view.len(), 1);
        assert!(!view.loading);
        assert!(
            view.error
                .as_deref()
                .is_some_and(|e| e.contains("connection refused"))
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn get_process_status_merges_one_entry() -> TestResult {
    with_timeout(async {
        init_tracing();
        let service = Arc::new(FakeProcessService::new());
        service.insert_process("db", ProcessSnapshot::running(55, TS));
        let (_registry, gateway) = setup(service.clone());

        let db = gateway
            .get_process_status("db")
            .await?
            .ok_or("missing db")?;
        assert_eq!(db.status, ProcessStatus::Running);
        assert_eq!(db.pid, Some(55));

        assert!(gateway.get_process_status("nobody").await?.is_none());
        assert_eq!(service.count_calls("get_process_status"), 2);
        Ok(())
    })
    .await
}
