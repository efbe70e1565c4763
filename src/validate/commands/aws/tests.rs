use super::*;

#[test]
fn aws_denied_when_disabled() {
    let config = PolicyConfig::default();
    let declared = HashSet::new();
    assert!(validate(&["aws".to_string(), "s3".to_string(), "ls".to_string()], &config, &declared).is_err());
}

#[test]
fn aws_allowed_with_raw_credentials() {
    let mut config = PolicyConfig::default();
    config.aws.allow_raw_credentials = true;
    let declared = HashSet::new();
    assert!(validate(&["aws".to_string()], &config, &declared).is_ok());
}

#[test]
fn aws_allowed_with_force_profile() {
    let mut config = PolicyConfig::default();
    config.aws.force_profile = Some("sandboxed-role".to_string());
    let declared = HashSet::new();
    assert!(validate(&["aws".to_string()], &config, &declared).is_ok());
}
