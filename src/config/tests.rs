use super::*;

#[test]
fn defaults_match_spec() {
    let git = GitConfig::default();
    assert!(git.local_read);
    assert!(git.local_write);
    assert!(git.remote_read);
    assert!(!git.remote_write);

    let runtimes = RuntimesConfig::default();
    assert!(!runtimes.go.enabled);
    assert!(!runtimes.go.generate);
    assert!(!runtimes.pnpm.enabled);
    assert!(!runtimes.pnpm.publish);
    assert!(!runtimes.rust.enabled);
    assert!(!runtimes.rust.publish);

    assert!(!AwsConfig::default().enabled());
    assert!(!LocalBinaryExecutionConfig::default().enabled);
}

#[test]
fn aws_mode_resolves_raw_credentials() {
    let aws = AwsConfig {
        allow_raw_credentials: true,
        force_profile: None,
    };
    assert_eq!(aws.mode(), AwsMode::RawCredentials);
    assert!(aws.enabled());
}

#[test]
fn aws_mode_resolves_imds_profile() {
    let aws = AwsConfig {
        allow_raw_credentials: false,
        force_profile: Some("sandboxed-role".to_string()),
    };
    assert_eq!(aws.mode(), AwsMode::ImdsProfile("sandboxed-role".to_string()));
}

#[test]
fn config_store_reload_replaces_snapshot() {
    let store = ConfigStore::new(PolicyConfig::default());
    assert!(!store.load().os_sandbox);

    let mut updated = PolicyConfig::default();
    updated.os_sandbox = true;
    store.reload(updated);

    assert!(store.load().os_sandbox);
}

#[test]
fn all_read_roots_includes_runtime_detected() {
    let mut config = PolicyConfig::default();
    config.readable_paths.push(PathBuf::from("/workspace"));
    config.runtime_detected_roots.push(PathBuf::from("/home/u/go"));

    let roots = config.all_read_roots();
    assert_eq!(roots.len(), 2);
    assert!(roots.contains(&PathBuf::from("/workspace")));
    assert!(roots.contains(&PathBuf::from("/home/u/go")));
}
