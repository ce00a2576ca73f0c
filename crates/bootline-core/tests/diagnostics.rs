//! Diagnostic output of the bootstrap.
//!
//! These tests capture tracing output with `#[traced_test]` and check which
//! failures end up in the log, and how often.

use std::sync::Arc;

use bootline_core::fakes::{
    CallLog, EngineScript, FakeAutocomplete, FakeEngineFactory, FakeErrorHandler, FakeReporter,
};
use bootline_core::{
    emit_background_fault, Bootstrap, ExitController, ExitStatus, FaultTap, InvocationId,
    InvocationSpan, Plugin, PluginRegistry,
};
use tracing_test::traced_test;

fn deploy() -> Vec<String> {
    vec!["deploy".to_string()]
}

fn bootstrap_with(
    log: &CallLog,
    reporter: FakeReporter,
    script: EngineScript,
    plugins: PluginRegistry,
) -> Bootstrap {
    Bootstrap::new(
        InvocationId::generate(),
        Arc::new(reporter),
        Arc::new(FakeAutocomplete::new(log.clone())),
        FakeEngineFactory::new(log.clone(), script, plugins),
    )
}

fn failing_execute() -> EngineScript {
    EngineScript {
        fail_execute: Some("stack update failed".to_string()),
        ..Default::default()
    }
}

/// Test: a successful run logs no error at all
#[traced_test]
#[tokio::test]
async fn quiet_success_run() {
    let log = CallLog::new();
    let bootstrap = bootstrap_with(
        &log,
        FakeReporter::new(log.clone()),
        EngineScript::default(),
        PluginRegistry::new(),
    );

    let status = bootstrap
        .run_to_exit(&deploy(), &ExitController::new(false))
        .await;

    assert_eq!(status, ExitStatus::Success);
    assert!(!logs_contain("invocation.failed"));
    assert!(!logs_contain("ERROR"));
}

/// Test: without a handler the root cause is logged exactly once
#[traced_test]
#[tokio::test]
async fn unhandled_failure_logged_once() {
    let log = CallLog::new();
    let bootstrap = bootstrap_with(
        &log,
        FakeReporter::new(log.clone()),
        failing_execute(),
        PluginRegistry::new().with_plugin(Plugin::new("aws")),
    );

    let status = bootstrap
        .run_to_exit(&deploy(), &ExitController::new(false))
        .await;

    assert_eq!(status.code(), 1);
    logs_assert(|lines: &[&str]| {
        let failed = lines
            .iter()
            .filter(|line| line.contains("invocation.failed"))
            .collect::<Vec<_>>();
        match failed.as_slice() {
            [line] if line.contains("stack update failed") => Ok(()),
            other => Err(format!("expected one root-cause line, got {}", other.len())),
        }
    });
    assert!(!logs_contain("error_handler.selected"));
}

/// Test: a succeeding handler still leaves the original error in the log
#[traced_test]
#[tokio::test]
async fn reported_failure_still_logged() {
    let log = CallLog::new();
    let handler = Arc::new(FakeErrorHandler::new("enterprise", log.clone()));
    let bootstrap = bootstrap_with(
        &log,
        FakeReporter::new(log.clone()),
        failing_execute(),
        PluginRegistry::new().with_plugin(Plugin::new("enterprise").with_error_handler(handler)),
    );

    let status = bootstrap
        .run_to_exit(&deploy(), &ExitController::new(false))
        .await;

    assert_eq!(status.code(), 1);
    assert_eq!(log.count("handler.enterprise"), 1);
    assert!(logs_contain("error_handler.selected"));
    assert!(logs_contain("stack update failed"));
    assert!(!logs_contain("error_handler.failed"));
}

/// Test: a failing handler shows up next to, not instead of, the root cause
#[traced_test]
#[tokio::test]
async fn broken_handler_and_root_cause_both_logged() {
    let log = CallLog::new();
    let handler = Arc::new(FakeErrorHandler::failing(
        "enterprise",
        log.clone(),
        "collector unreachable",
    ));
    let bootstrap = bootstrap_with(
        &log,
        FakeReporter::new(log.clone()),
        failing_execute(),
        PluginRegistry::new().with_plugin(Plugin::new("enterprise").with_error_handler(handler)),
    );

    let status = bootstrap
        .run_to_exit(&deploy(), &ExitController::new(false))
        .await;

    assert_eq!(status, ExitStatus::Failure);
    assert!(logs_contain("error_handler.failed"));
    assert!(logs_contain("collector unreachable"));
    logs_assert(|lines: &[&str]| {
        let root = lines
            .iter()
            .filter(|line| line.contains("invocation.failed"))
            .collect::<Vec<_>>();
        match root.as_slice() {
            [line] if line.contains("stack update failed") && !line.contains("collector") => {
                Ok(())
            }
            _ => Err("root cause line missing or replaced".to_string()),
        }
    });
}

/// Test: telemetry failure is a warning, not an error
#[traced_test]
#[tokio::test]
async fn reporter_failure_is_a_warning() {
    let log = CallLog::new();
    let bootstrap = bootstrap_with(
        &log,
        FakeReporter::failing(log.clone(), "dsn rejected"),
        EngineScript::default(),
        PluginRegistry::new(),
    );

    let status = bootstrap
        .run_to_exit(&deploy(), &ExitController::new(false))
        .await;

    assert_eq!(status, ExitStatus::Success);
    assert!(logs_contain("reporter.failed"));
    assert!(logs_contain("dsn rejected"));
    assert!(logs_contain("WARN"));
    assert!(!logs_contain("invocation.failed"));
}

/// Test: background faults are logged with their source
#[traced_test]
#[tokio::test]
async fn background_fault_logged_with_source() {
    let log = CallLog::new();
    let bootstrap = bootstrap_with(
        &log,
        FakeReporter::new(log.clone()),
        EngineScript {
            background_failure: Some("cache refresh failed".to_string()),
            ..Default::default()
        },
        PluginRegistry::new(),
    );

    let status = bootstrap
        .run_to_exit(&deploy(), &ExitController::new(false))
        .await;

    assert_eq!(status, ExitStatus::Success);
    assert!(logs_contain("fault.unobserved"));
    assert!(logs_contain("fake.background"));
    assert!(logs_contain("cache refresh failed"));
}

/// Test: every lifecycle event carries the invocation id
#[traced_test]
#[tokio::test]
async fn events_carry_invocation_id() {
    let log = CallLog::new();
    let bootstrap = bootstrap_with(
        &log,
        FakeReporter::new(log.clone()),
        EngineScript::default(),
        PluginRegistry::new(),
    );
    let id = bootstrap.invocation_id().to_string();

    bootstrap.run(&deploy()).await;

    assert!(logs_contain(&format!("invocation_id={id}")));
    assert!(logs_contain("dispatch.selected"));
}

/// Test: emit_background_fault inside an InvocationSpan does not panic
#[traced_test]
#[test]
fn standalone_fault_emission() {
    let id = InvocationId::generate();
    let _span = InvocationSpan::enter(&id);
    emit_background_fault("standalone", &"disk full");
    assert!(logs_contain("disk full"));
}

/// Test: the panic hook logs panics from detached threads with the invocation id
#[traced_test]
#[test]
fn panic_hook_logs_thread_panics() {
    let id = InvocationId::generate();
    let tap = FaultTap::new(id);
    let previous = std::panic::take_hook();
    tap.install_panic_hook();

    // The hook runs on the panicking thread; carry the test span over so the
    // captured line is attributed to this test.
    let span = tracing::Span::current();
    let joined = std::thread::spawn(move || {
        let _entered = span.enter();
        panic!("worker exploded");
    })
    .join();

    std::panic::set_hook(previous);

    assert!(joined.is_err());
    assert!(logs_contain("fault.panic"));
    assert!(logs_contain("worker exploded"));
    assert!(logs_contain(&id.to_string()));
}

/// Test: a handler panic is logged as a handler failure
#[traced_test]
#[tokio::test]
async fn panicking_handler_logged_as_handler_failure() {
    let log = CallLog::new();
    let handler = Arc::new(FakeErrorHandler::panicking(
        "enterprise",
        log.clone(),
        "collector crashed",
    ));
    let bootstrap = bootstrap_with(
        &log,
        FakeReporter::new(log.clone()),
        failing_execute(),
        PluginRegistry::new().with_plugin(Plugin::new("enterprise").with_error_handler(handler)),
    );

    let status = bootstrap
        .run_to_exit(&deploy(), &ExitController::new(false))
        .await;

    assert_eq!(status, ExitStatus::Failure);
    assert!(logs_contain("error_handler.failed"));
    assert!(logs_contain("error handler panicked: collector crashed"));
    assert!(logs_contain("stack update failed"));
}
