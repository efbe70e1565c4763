use super::*;
use crate::config::LocalBinaryExecutionConfig;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

fn python3_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Same canned-response worker stand-in used by `crate::worker`'s own tests:
/// a ready frame, then a fixed successful response for every request.
fn write_worker_fixture() -> tempfile::TempPath {
    let script = r#"#!/usr/bin/env python3
import sys, struct, json

def read_frame():
    hdr = sys.stdin.buffer.read(4)
    if len(hdr) < 4:
        sys.exit(0)
    n = struct.unpack('>I', hdr)[0]
    sys.stdin.buffer.read(n)

def write_frame(obj):
    body = json.dumps(obj).encode()
    sys.stdout.buffer.write(struct.pack('>I', len(body)))
    sys.stdout.buffer.write(body)
    sys.stdout.buffer.flush()

write_frame({"ready": True})
while True:
    read_frame()
    write_frame({"stdout": [104, 105, 10], "stderr": [], "exitCode": 0, "errorMessage": None})
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(script.as_bytes()).unwrap();
    let path = file.into_temp_path();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn sandbox_with(config: PolicyConfig, worker_program: PathBuf) -> Sandbox {
    Sandbox::new(Arc::new(ConfigStore::new(config)), worker_program)
}

#[test]
fn validate_denies_path_outside_roots() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let sandbox = sandbox_with(PolicyConfig::default(), PathBuf::from("/nonexistent-worker"));

    let err = sandbox
        .validate("cat /etc/passwd", &root, &[root.clone()], &[root.clone()], None)
        .unwrap_err();
    assert!(matches!(err, SandboxError::PathBoundary { .. }));
}

#[test]
fn validate_denies_a_coprocess_clause() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let sandbox = sandbox_with(PolicyConfig::default(), PathBuf::from("/nonexistent-worker"));

    // `brush_parser::ast::Command` has no coprocess variant — the exhaustive
    // match in both `validate::validate_command` and `shell::ast::walk_command`
    // lists exactly `Simple`/`Compound`/`Function`/`ExtendedTest` with no
    // wildcard arm. A coprocess clause therefore either fails to parse
    // outright, or is represented as an ordinary simple command named
    // `coproc`, which the allowlist denies since `coproc` is not a registered
    // builtin. Either path is a denial.
    let err = sandbox
        .validate("coproc NAME { echo hi; }", &root, &[root.clone()], &[root.clone()], None)
        .unwrap_err();
    assert!(matches!(err, SandboxError::Parse(_) | SandboxError::Validation { .. }));
}

#[test]
fn validate_accepts_an_allowlisted_command_with_no_path_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let sandbox = sandbox_with(PolicyConfig::default(), PathBuf::from("/nonexistent-worker"));

    assert!(sandbox
        .validate("echo hello", &root, &[root.clone()], &[root.clone()], None)
        .is_ok());
}

#[tokio::test]
async fn execute_runs_locally_when_os_sandbox_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let config = PolicyConfig {
        os_sandbox: false,
        ..Default::default()
    };
    let sandbox = sandbox_with(config, PathBuf::from("/nonexistent-worker"));

    let output = sandbox
        .execute("echo hello", &root, &[root.clone()], &[root.clone()], None)
        .await
        .unwrap();
    assert_eq!(output, b"hello\n");
}

#[tokio::test]
async fn execute_dispatches_to_the_worker_when_os_sandbox_enabled() {
    if !python3_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let fixture = write_worker_fixture();
    let config = PolicyConfig {
        os_sandbox: true,
        ..Default::default()
    };
    let sandbox = sandbox_with(config, fixture.to_path_buf());

    let output = sandbox
        .execute("echo hi", &root, &[root.clone()], &[root.clone()], None)
        .await
        .unwrap();
    assert_eq!(output, b"hi\n");
    assert!(!sandbox.is_worker_dead().await);
}

#[tokio::test]
async fn execute_runs_a_script_path_invocation_in_process_when_not_a_compiled_binary() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let script_path = root.join("greet.sh");
    std::fs::write(&script_path, b"#!/bin/sh\necho scripted\n").unwrap();
    std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = PolicyConfig {
        os_sandbox: false,
        local_binary_execution: LocalBinaryExecutionConfig { enabled: true },
        ..Default::default()
    };
    let sandbox = sandbox_with(config, PathBuf::from("/nonexistent-worker"));

    let output = sandbox
        .execute("./greet.sh", &root, &[root.clone()], &[root.clone()], None)
        .await
        .unwrap();
    assert_eq!(output, b"scripted\n");
}

#[tokio::test]
async fn execute_aborts_a_hanging_local_spawn_once_the_deadline_elapses() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let config = PolicyConfig {
        os_sandbox: false,
        ..Default::default()
    };
    let sandbox = sandbox_with(config, PathBuf::from("/nonexistent-worker"));

    let err = sandbox
        .execute("sleep 5", &root, &[root.clone()], &[root.clone()], Some(Duration::from_millis(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, SandboxError::DeadlineExceeded { .. }));
}

#[tokio::test]
async fn execute_preserves_output_from_commands_that_finished_before_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let config = PolicyConfig {
        os_sandbox: false,
        ..Default::default()
    };
    let sandbox = sandbox_with(config, PathBuf::from("/nonexistent-worker"));

    let err = sandbox
        .execute(
            "echo first; sleep 5",
            &root,
            &[root.clone()],
            &[root.clone()],
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    let SandboxError::DeadlineExceeded { partial_output } = err else {
        panic!("expected DeadlineExceeded, got {err:?}");
    };
    assert_eq!(partial_output, b"first\n");
}

#[tokio::test]
async fn is_worker_dead_is_false_before_the_worker_has_ever_been_used() {
    let sandbox = sandbox_with(PolicyConfig::default(), PathBuf::from("/nonexistent-worker"));
    assert!(!sandbox.is_worker_dead().await);
}
