// tests/event_decode.rs
mod common;
use crate::common::builders::{TS, payload};
use crate::common::init_tracing;

use std::error::Error;

use chrono::DateTime;
use serde_json::json;

use procsync::SyncError;
use procsync::events::{EventChannel, EventEnvelope, EventKind, OutputStream, decode};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn started_payload_decodes_pid_and_start_time() -> TestResult {
    init_tracing();
    let event = decode(EventChannel::ProcessStarted, payload::started("web", 42))?;

    assert_eq!(event.id, "web");
    assert_eq!(event.timestamp, TS);
    assert_eq!(
        event.kind,
        EventKind::Started {
            pid: Some(42),
            started_at: Some(TS.to_string()),
        }
    );
    assert_eq!(event.channel(), EventChannel::ProcessStarted);
    Ok(())
}

#[test]
fn alternate_field_spellings_are_accepted() -> TestResult {
    init_tracing();

    let output = decode(
        EventChannel::ProcessOutput,
        json!({ "appId": "web", "type": "stderr", "content": "oops", "timestamp": TS }),
    )?;
    assert_eq!(output.id, "web");
    assert_eq!(
        output.kind,
        EventKind::Output {
            stream: OutputStream::Stderr,
            content: "oops".into(),
        }
    );

    let error = decode(
        EventChannel::ProcessError,
        json!({ "appId": "web", "message": "crashed" }),
    )?;
    assert_eq!(
        error.kind,
        EventKind::Error {
            error: "crashed".into()
        }
    );
    Ok(())
}

#[test]
fn null_or_missing_exit_code_decodes_as_none() -> TestResult {
    init_tracing();

    let null_code = decode(
        EventChannel::ProcessExit,
        json!({ "id": "a", "exitCode": null, "timestamp": TS }),
    )?;
    assert_eq!(null_code.kind, EventKind::Exit { exit_code: None });

    let missing = decode(EventChannel::ProcessExit, json!({ "id": "a" }))?;
    assert_eq!(missing.kind, EventKind::Exit { exit_code: None });

    let negative = decode(
        EventChannel::ProcessExit,
        json!({ "id": "a", "exitCode": -1 }),
    )?;
    assert_eq!(negative.kind, EventKind::Exit { exit_code: Some(-1) });
    Ok(())
}

#[test]
fn missing_timestamp_is_filled_with_receive_time() -> TestResult {
    init_tracing();
    let event = decode(EventChannel::ProcessStopped, json!({ "id": "a" }))?;

    assert_eq!(event.kind, EventKind::Stopped);
    assert!(DateTime::parse_from_rfc3339(&event.timestamp).is_ok());
    Ok(())
}

#[test]
fn browser_events_decode() -> TestResult {
    init_tracing();

    let launched = decode(
        EventChannel::BrowserLaunched,
        payload::browser_launched("site", "http://localhost:5173"),
    )?;
    assert_eq!(
        launched.kind,
        EventKind::BrowserLaunched {
            url: "http://localhost:5173".into()
        }
    );

    let failed = decode(
        EventChannel::BrowserLaunchFailed,
        json!({ "id": "site", "reason": "no display" }),
    )?;
    assert_eq!(
        failed.kind,
        EventKind::BrowserLaunchFailed {
            url: None,
            reason: "no display".into(),
        }
    );
    Ok(())
}

#[test]
fn malformed_payloads_are_decode_errors() -> TestResult {
    init_tracing();

    let cases = [
        (EventChannel::ProcessStarted, json!({ "pid": 1 })),
        (
            EventChannel::ProcessOutput,
            json!({ "id": "a", "stream": "stdin", "content": "x" }),
        ),
        (EventChannel::ProcessError, json!({ "id": "a" })),
        (EventChannel::ProcessStopped, json!([1, 2, 3])),
    ];

    for (channel, value) in cases {
        let err = decode(channel, value).unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)), "{channel}: {err}");
    }
    Ok(())
}

#[test]
fn envelope_uses_channel_names() -> TestResult {
    init_tracing();
    let envelope: EventEnvelope = serde_json::from_str(
        r#"{"channel":"browser-launch-failed","payload":{"id":"x","reason":"r"}}"#,
    )?;
    assert_eq!(envelope.channel, EventChannel::BrowserLaunchFailed);

    for channel in EventChannel::ALL {
        assert_eq!(channel.name().parse::<EventChannel>()?, channel);
        assert_eq!(serde_json::to_value(channel)?, json!(channel.name()));
    }
    assert!("process-restarted".parse::<EventChannel>().is_err());
    Ok(())
}
