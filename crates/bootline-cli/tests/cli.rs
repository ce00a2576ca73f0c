//! End-to-end checks of the `bootline` binary: exit codes, the completion
//! fast path and the file-backed error report.

use assert_cmd::Command;
use predicates::prelude::*;

fn bootline() -> Command {
    let mut cmd = Command::cargo_bin("bootline").unwrap();
    for key in [
        "BOOTLINE_DEBUG",
        "BOOTLINE_LOG",
        "BOOTLINE_LOG_FORMAT",
        "BOOTLINE_REPORTING_DSN",
        "BOOTLINE_REPORTING_TIMEOUT_MS",
        "BOOTLINE_ERROR_REPORT_FILE",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn info_exits_zero() {
    bootline()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invocation:"))
        .stdout(predicate::str::contains("core, exec"));
}

#[test]
fn exec_success_exits_zero() {
    bootline().args(["exec", "--", "true"]).assert().code(0);
}

#[test]
fn exec_failure_exits_one() {
    bootline()
        .args(["exec", "--", "sh", "-c", "exit 7"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("exited with status 7"));
}

#[test]
fn exec_forwards_child_output() {
    bootline()
        .args(["exec", "--", "echo", "hello from child"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello from child"));
}

#[test]
fn exec_forwards_raw_bytes_unchanged() {
    bootline()
        .args(["exec", "--", "sh", "-c", "printf 'a\\377b\\r\\nnoeol'"])
        .assert()
        .code(0)
        .stdout(&b"a\xffb\r\nnoeol"[..]);
}

#[test]
fn exec_sees_invocation_id() {
    bootline()
        .args(["exec", "--", "sh", "-c", "test -n \"$BOOTLINE_INVOCATION_ID\""])
        .assert()
        .success();
}

#[test]
fn unknown_command_exits_one() {
    bootline().arg("frobnicate").assert().code(1);
}

#[test]
fn no_arguments_exits_one() {
    bootline().assert().code(1);
}

#[test]
fn help_exits_zero() {
    bootline()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn completion_prints_script() {
    bootline()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bootline"));
}

#[test]
fn completion_after_a_global_flag_goes_through_the_engine() {
    bootline()
        .args(["--json", "completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bootline"));
}

#[test]
fn completion_failure_exits_one() {
    bootline().args(["completion", "tcsh"]).assert().code(1);
}

#[test]
fn completion_does_not_consult_error_handler() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("errors.jsonl");

    bootline()
        .env("BOOTLINE_ERROR_REPORT_FILE", &report)
        .args(["completion", "tcsh"])
        .assert()
        .code(1);

    assert!(!report.exists());
}

#[test]
fn failed_exec_is_written_to_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("errors.jsonl");

    bootline()
        .env("BOOTLINE_ERROR_REPORT_FILE", &report)
        .args(["exec", "--", "false"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("exited with status 1"));

    let contents = std::fs::read_to_string(&report).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert!(entry["error"]
        .as_str()
        .unwrap()
        .contains("exited with status 1"));
    assert!(entry["invocation_id"].is_string());
}

#[test]
fn broken_report_file_keeps_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("missing").join("errors.jsonl");

    bootline()
        .env("BOOTLINE_ERROR_REPORT_FILE", &report)
        .args(["exec", "--", "false"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error_handler.failed"));
}

#[test]
fn invalid_reporting_dsn_is_not_fatal() {
    bootline()
        .env("BOOTLINE_REPORTING_DSN", "garbage")
        .arg("info")
        .assert()
        .success()
        .stderr(predicate::str::contains("reporter.failed"));
}

#[test]
fn invalid_config_exits_one() {
    bootline()
        .env("BOOTLINE_REPORTING_TIMEOUT_MS", "soon")
        .arg("info")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("BOOTLINE_REPORTING_TIMEOUT_MS"));
}

#[test]
fn plugins_json_lists_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let output = bootline()
        .env("BOOTLINE_ERROR_REPORT_FILE", dir.path().join("errors.jsonl"))
        .args(["plugins", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["name"], "error-report-file");
    assert_eq!(rows[2]["error_handler"], true);
    assert_eq!(rows[0]["error_handler"], false);
}
