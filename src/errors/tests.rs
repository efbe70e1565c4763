use super::*;

#[test]
fn exit_code_is_recognized() {
    let err = SandboxError::ExitCode(1);
    assert!(err.is_exit_code());
}

#[test]
fn other_variants_are_not_exit_code() {
    assert!(!SandboxError::DeadlineExceeded { partial_output: Vec::new() }.is_exit_code());
    assert!(!SandboxError::Worker("down".into()).is_exit_code());
}

#[test]
fn deadline_exceeded_carries_its_partial_output() {
    let err = SandboxError::DeadlineExceeded {
        partial_output: b"partial\n".to_vec(),
    };
    let SandboxError::DeadlineExceeded { partial_output } = err else {
        panic!("expected DeadlineExceeded");
    };
    assert_eq!(partial_output, b"partial\n");
}

#[test]
fn validation_error_display_includes_literal() {
    let err = SandboxError::validation("command-name", "curl", "not in allowlist");
    let msg = err.to_string();
    assert!(msg.contains("curl"));
    assert!(msg.contains("not in allowlist"));
}
