use super::*;

fn words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[test]
fn denies_delete_flag() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    let err = validate(&words("find . -delete"), &config, &declared).unwrap_err();
    assert!(matches!(err, SandboxError::Validation { .. }));
}

#[test]
fn recursively_validates_exec_subcommand() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    let err = validate(&words("find . -exec rm {} ;"), &config, &declared).unwrap_err();
    match err {
        SandboxError::Validation { literal, .. } => assert_eq!(literal, "rm"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn accepts_exec_with_allowed_subcommand() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&words("find . -exec cat {} ;"), &config, &declared).is_ok());
}

#[test]
fn exec_with_no_subcommand_is_denied() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    let err = validate(&words("find . -exec ;"), &config, &declared).unwrap_err();
    assert!(matches!(err, SandboxError::Validation { .. }));
}

#[test]
fn plain_find_is_accepted() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&words("find . -name foo"), &config, &declared).is_ok());
}
