//! Policy configuration: the snapshot `Sandbox::validate`/`execute` consult.
//!
//! Mirrors the read-copy-update discipline described in `spec.md` §3/§9 —
//! `ConfigStore` holds an `Arc<PolicyConfig>` behind a `RwLock` so writers
//! replace the whole snapshot atomically and readers only ever see a
//! coherent view for the duration of one call.

pub mod loader;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

pub use loader::{ConfigParseError, load_config, parse_config};

fn default_true() -> bool {
    true
}

/// Filesystem/network rules handed to the OS-sandbox worker (Landlock on
/// Linux, Seatbelt on macOS) for a single shell invocation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub additional_read_paths: Vec<String>,
    #[serde(default)]
    pub additional_write_paths: Vec<String>,
    #[serde(default = "default_true")]
    pub block_network: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            additional_read_paths: Vec::new(),
            additional_write_paths: Vec::new(),
            block_network: true,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_true")]
    pub local_read: bool,
    #[serde(default = "default_true")]
    pub local_write: bool,
    #[serde(default = "default_true")]
    pub remote_read: bool,
    #[serde(default)]
    pub remote_write: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            local_read: true,
            local_write: true,
            remote_read: true,
            remote_write: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct GoRuntimeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub generate: bool,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct PnpmRuntimeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct RustRuntimeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct RuntimesConfig {
    #[serde(default)]
    pub go: GoRuntimeConfig,
    #[serde(default)]
    pub pnpm: PnpmRuntimeConfig,
    #[serde(default)]
    pub rust: RustRuntimeConfig,
}

/// Resolved AWS access mode. `AwsConfig` enforces exactly-one-of at
/// construction time; this is the decoded form the validators consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwsMode {
    Disabled,
    RawCredentials,
    ImdsProfile(String),
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AwsConfig {
    #[serde(default)]
    pub allow_raw_credentials: bool,
    #[serde(default)]
    pub force_profile: Option<String>,
}

impl AwsConfig {
    pub fn mode(&self) -> AwsMode {
        match (&self.allow_raw_credentials, &self.force_profile) {
            (false, None) => AwsMode::Disabled,
            (true, None) => AwsMode::RawCredentials,
            (false, Some(profile)) => AwsMode::ImdsProfile(profile.clone()),
            // Both set is a config-time mistake; loader rejects it, but if one
            // slips through here we prefer the safer IMDS path over raw files.
            (true, Some(profile)) => AwsMode::ImdsProfile(profile.clone()),
        }
    }

    pub fn enabled(&self) -> bool {
        !matches!(self.mode(), AwsMode::Disabled)
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct LocalBinaryExecutionConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// One coherent configuration snapshot.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    pub extra_commands: HashSet<String>,
    pub readable_paths: Vec<PathBuf>,
    pub writable_paths: Vec<PathBuf>,
    pub git: GitConfig,
    pub runtimes: RuntimesConfig,
    pub aws: AwsConfig,
    pub local_binary_execution: LocalBinaryExecutionConfig,
    pub os_sandbox: bool,
    pub sandbox: SandboxConfig,
    /// Populated by `Sandbox` after probing enabled runtimes (§3 "Runtime-detected roots").
    /// Not part of the on-disk shape; carried alongside the snapshot so it is
    /// replaced atomically together with the rest of the configuration.
    pub runtime_detected_roots: Vec<PathBuf>,
}

impl PolicyConfig {
    /// All roots a reader should be allowed to see: configured `readable_paths`
    /// plus whatever runtime probing discovered (GOPATH, pnpm store, CARGO_HOME, …).
    pub fn all_read_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.readable_paths.clone();
        roots.extend(self.runtime_detected_roots.iter().cloned());
        roots
    }
}

/// Atomically-swappable configuration snapshot.
///
/// Writers call `reload` with a freshly built `PolicyConfig`; readers call
/// `load` to get an `Arc` they can hold for the duration of one
/// `validate`/`execute` call without racing a concurrent reload.
#[derive(Debug)]
pub struct ConfigStore {
    inner: RwLock<Arc<PolicyConfig>>,
}

impl ConfigStore {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            inner: RwLock::new(Arc::new(config)),
        }
    }

    pub fn load(&self) -> Arc<PolicyConfig> {
        self.inner
            .read()
            .expect("config store lock poisoned")
            .clone()
    }

    pub fn reload(&self, config: PolicyConfig) {
        let mut guard = self.inner.write().expect("config store lock poisoned");
        *guard = Arc::new(config);
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

#[cfg(test)]
mod tests;
