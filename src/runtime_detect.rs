//! Runtime-detected roots (`spec.md` §3): when a language runtime is
//! enabled in policy, probe it for the directories it needs read access to
//! (package caches, toolchain homes) rather than asking the operator to list
//! them by hand.
//!
//! Each probe shells out to the runtime's own introspection command the same
//! way the teacher's `ExecTool` spawns any other subprocess — scrubbed
//! environment, bounded wait — and fails soft: a probe that errors or isn't
//! installed just contributes no roots instead of failing configuration load.

use crate::config::RuntimesConfig;
use crate::utils::subprocess::scrubbed_command;
use std::path::PathBuf;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

async fn run_probe(program: &str, args: &[&str]) -> Option<String> {
    let mut cmd = scrubbed_command(program);
    cmd.args(args);
    let output = tokio::time::timeout(PROBE_TIMEOUT, cmd.output()).await.ok()??;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

async fn go_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(path) = run_probe("go", &["env", "GOPATH"]).await {
        roots.push(PathBuf::from(path));
    }
    if let Some(path) = run_probe("go", &["env", "GOCACHE"]).await {
        roots.push(PathBuf::from(path));
    }
    roots
}

async fn pnpm_roots() -> Vec<PathBuf> {
    run_probe("pnpm", &["store", "path"])
        .await
        .map(|path| vec![PathBuf::from(path)])
        .unwrap_or_default()
}

async fn rust_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(path) = std::env::var("CARGO_HOME") {
        roots.push(PathBuf::from(path));
    } else if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".cargo"));
    }
    if let Ok(path) = std::env::var("RUSTUP_HOME") {
        roots.push(PathBuf::from(path));
    } else if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".rustup"));
    }
    roots
}

/// Probe every enabled runtime in `config` and return the union of
/// discovered roots. Disabled runtimes contribute nothing, so the result
/// only ever grows the read surface for runtimes policy already opted into.
pub async fn detect(config: &RuntimesConfig) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if config.go.enabled {
        roots.extend(go_roots().await);
    }
    if config.pnpm.enabled {
        roots.extend(pnpm_roots().await);
    }
    if config.rust.enabled {
        roots.extend(rust_roots().await);
    }
    roots
}

#[cfg(test)]
mod tests;
