use super::*;
use crate::config::RuntimesConfig;

#[tokio::test]
async fn disabled_runtimes_contribute_no_roots() {
    let config = RuntimesConfig::default();
    let roots = detect(&config).await;
    assert!(roots.is_empty());
}

#[tokio::test]
async fn rust_roots_fall_back_to_home_dir_when_env_unset() {
    // SAFETY: test-only process-wide env mutation, no concurrent readers in
    // this test binary's other threads touch these two variables.
    unsafe {
        std::env::remove_var("CARGO_HOME");
        std::env::remove_var("RUSTUP_HOME");
    }
    let roots = rust_roots().await;
    if dirs::home_dir().is_some() {
        assert_eq!(roots.len(), 2);
    }
}
