use super::*;

#[test]
fn parses_minimal_yaml() {
    let yaml = "extra_commands: [foo]\nos_sandbox: true\n";
    let config = parse_config(yaml).unwrap();
    assert!(config.extra_commands.contains("foo"));
    assert!(config.os_sandbox);
    assert!(config.git.local_read); // default preserved
}

#[test]
fn unknown_keys_are_ignored() {
    let yaml = "totally_unknown_key: 42\nextra_commands: [bar]\n";
    let config = parse_config(yaml).unwrap();
    assert!(config.extra_commands.contains("bar"));
}

#[test]
fn aws_both_set_is_rejected() {
    let yaml = "aws:\n  allow_raw_credentials: true\n  force_profile: myrole\n";
    let err = parse_config(yaml).unwrap_err();
    assert!(matches!(err, ConfigParseError::AwsBothSet));
}

#[test]
fn tilde_paths_are_absolutized() {
    let yaml = "readable_paths: [\"~/work\"]\n";
    let config = parse_config(yaml).unwrap();
    assert_eq!(config.readable_paths.len(), 1);
    assert!(config.readable_paths[0].is_absolute());
}

#[test]
fn load_config_missing_file_errors() {
    let err = load_config(Path::new("/nonexistent/config.yaml")).unwrap_err();
    assert!(matches!(err, ConfigParseError::Read { .. }));
}
