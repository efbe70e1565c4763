use super::*;

fn parse(command: &str) -> ast::Program {
    let cursor = std::io::Cursor::new(command);
    let reader = std::io::BufReader::new(cursor);
    let options = brush_parser::ParserOptions::default();
    let source_info = brush_parser::SourceInfo::default();
    let mut parser = brush_parser::Parser::new(reader, &options, &source_info);
    parser.parse_program().expect("test command should parse")
}

#[test]
fn accepts_plain_allowlisted_command() {
    let program = parse("echo hello");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_ok());
}

#[test]
fn denies_command_not_on_allowlist() {
    let program = parse("curl http://example.com");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_err());
}

#[test]
fn extra_commands_union_into_allowlist() {
    let program = parse("curl http://example.com");
    let mut config = PolicyConfig::default();
    config.extra_commands.insert("curl".to_string());
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_ok());
}

#[test]
fn declared_functions_are_callable() {
    let program = parse("mytool --flag");
    let config = PolicyConfig::default();
    let mut declared = HashSet::new();
    declared.insert("mytool".to_string());
    assert!(validate(&program, &config, &declared).is_ok());
}

#[test]
fn denies_process_substitution() {
    let program = parse("diff <(echo a) <(echo b)");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_err());
}

#[test]
fn denies_output_redirect_to_non_dev_null() {
    let program = parse("echo hi > /etc/passwd");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_err());
}

#[test]
fn allows_output_redirect_to_dev_null() {
    let program = parse("echo hi > /dev/null");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_ok());
}

#[test]
fn denies_read_write_redirect() {
    let program = parse("cat <> /tmp/x");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_err());
}

#[test]
fn allows_fd_duplication_with_digit_target() {
    let program = parse("echo hi 2>&1");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_ok());
}

#[test]
fn denies_blocked_env_assignment() {
    let program = parse("LD_PRELOAD=/tmp/evil.so echo hi");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_err());
}

#[test]
fn denies_blocked_env_via_export() {
    let program = parse("export PATH=/tmp/evil");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_err());
}

#[test]
fn denies_dynamic_command_name() {
    let program = parse("$CMD arg");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_err());
}

#[test]
fn validation_is_recursive_inside_if_clause() {
    let program = parse("if true; then curl http://evil; fi");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_err());
}

#[test]
fn validation_is_recursive_inside_subshell() {
    let program = parse("(curl http://evil)");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&program, &config, &declared).is_err());
}

#[test]
fn script_path_form_requires_local_binary_execution() {
    let program = parse("./tool.sh --flag");
    let declared = HashSet::new();
    let config = PolicyConfig::default();
    assert!(validate(&program, &config, &declared).is_err());

    let mut enabled = PolicyConfig::default();
    enabled.local_binary_execution.enabled = true;
    assert!(validate(&program, &enabled, &declared).is_ok());
}

#[test]
fn per_command_validator_runs_for_registered_command() {
    let program = parse("git push origin main");
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    let err = validate(&program, &config, &declared).unwrap_err();
    match err {
        SandboxError::Validation { detail, .. } => assert!(detail.contains("remote_write")),
        other => panic!("unexpected error: {other:?}"),
    }
}
