//! Exception monitor lifecycle against a scripted host

use std::sync::Arc;

use beacon::client::TelemetryClient;
use beacon::config::ClientConfig;
use beacon::contracts::{ErrorInfo, FALLBACK_ERROR_MESSAGE};
use beacon::error::{ClientError, MonitorError};
use beacon::exceptions::{
    ExceptionMonitor, FatalChannel, HostRuntime, MonitorState, MonitorStrategy,
};

use super::test_utils::{event_log, monitor_guard, RecordingSink, ScriptedHost};

fn client(sink: Arc<RecordingSink>) -> Arc<TelemetryClient> {
    Arc::new(TelemetryClient::new(ClientConfig::new("ikey"), sink).unwrap())
}

#[test]
fn test_lifecycle_enable_disable_dispose() {
    let _guard = monitor_guard();
    let log = event_log();
    let host = ScriptedHost::new(Some("18.19.0"), log.clone());
    let client = client(RecordingSink::new(log.clone()));

    let monitor = ExceptionMonitor::new(client.clone(), host.clone()).unwrap();
    assert_eq!(monitor.state(), MonitorState::Uninitialized);

    monitor.enable(true);
    assert_eq!(monitor.state(), MonitorState::Enabled);
    assert_eq!(host.listener_count(FatalChannel::UncaughtExceptionMonitor), 1);

    monitor.enable(false);
    monitor.enable(false);
    assert_eq!(monitor.state(), MonitorState::Disabled);
    assert_eq!(host.listener_count(FatalChannel::UncaughtExceptionMonitor), 0);

    monitor.enable(true);
    assert_eq!(host.listener_count(FatalChannel::UncaughtExceptionMonitor), 1);

    monitor.dispose();
    assert_eq!(host.listener_count(FatalChannel::UncaughtExceptionMonitor), 0);
    assert!(log.lock().is_empty());
}

#[test]
fn test_singleton_surfaces_through_install() {
    let _guard = monitor_guard();
    let log = event_log();
    let host = ScriptedHost::new(Some("18.19.0"), log.clone());
    let client = client(RecordingSink::new(log));

    let first = ExceptionMonitor::install(client.clone(), host.clone())
        .unwrap()
        .unwrap();
    let second = ExceptionMonitor::install(client.clone(), host.clone());
    assert!(matches!(
        second,
        Err(ClientError::Monitor(MonitorError::AlreadyConfigured))
    ));
    assert_eq!(host.listener_count(FatalChannel::UncaughtExceptionMonitor), 1);
    drop(first);
}

#[test]
fn test_legacy_host_crash_sequence() {
    let _guard = monitor_guard();
    let log = event_log();
    let host = ScriptedHost::new(Some("v12.16.3"), log.clone());
    let sink = RecordingSink::new(log.clone());
    let client = client(sink.clone());

    let monitor = ExceptionMonitor::install(client.clone(), host.clone())
        .unwrap()
        .unwrap();
    assert_eq!(monitor.strategy(), MonitorStrategy::LegacyDual);

    host.fire(FatalChannel::UnhandledRejection, None);
    host.fire(
        FatalChannel::UncaughtException,
        Some(ErrorInfo::new("panic", "index out of bounds")),
    );

    assert_eq!(
        *log.lock(),
        vec![
            "flush:1:true".to_string(),
            "flush:1:true".to_string(),
            "exit:1".to_string(),
        ]
    );
    assert_eq!(
        sink.exception_messages(),
        vec![
            FALLBACK_ERROR_MESSAGE.to_string(),
            "index out of bounds".to_string(),
        ]
    );
}

#[test]
fn test_pending_telemetry_is_flushed_with_the_crash_report() {
    let _guard = monitor_guard();
    let log = event_log();
    let host = ScriptedHost::new(Some("20.0.0"), log.clone());
    let sink = RecordingSink::new(log.clone());
    let client = client(sink.clone());
    let _monitor = ExceptionMonitor::install(client.clone(), host.clone())
        .unwrap()
        .unwrap();

    client.track(beacon::contracts::EventTelemetry::new("before-crash"));
    host.fire(
        FatalChannel::UncaughtExceptionMonitor,
        Some(ErrorInfo::new("IoError", "broken pipe")),
    );

    assert_eq!(*log.lock(), vec!["flush:2:true".to_string()]);
    assert_eq!(sink.envelopes().len(), 2);
}
