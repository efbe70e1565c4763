use super::*;

fn words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[test]
fn no_embedded_command_is_accepted() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&words("xargs -0"), &config, &declared).is_ok());
}

#[test]
fn skips_value_consuming_flags_before_utility() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    let err = validate(&words("xargs -I {} rm {}"), &config, &declared).unwrap_err();
    match err {
        SandboxError::Validation { literal, .. } => assert_eq!(literal, "rm"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn double_dash_ends_option_parsing() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    let err = validate(&words("xargs -- rm"), &config, &declared).unwrap_err();
    assert!(matches!(err, SandboxError::Validation { .. }));
}

#[test]
fn accepts_allowlisted_embedded_utility() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&words("xargs cat"), &config, &declared).is_ok());
}
