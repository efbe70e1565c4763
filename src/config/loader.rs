//! Parses the external configuration shape described in `spec.md` §6.
//!
//! The YAML/TOML/JSON surface is owned by an external CLI — this module only
//! depends on the logical shape. Unknown keys are ignored for forward
//! compatibility (plain `serde(default)`, no `deny_unknown_fields`).

use super::{AwsConfig, GitConfig, LocalBinaryExecutionConfig, PolicyConfig, RuntimesConfig, SandboxConfig};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigParseError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config yaml: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("aws.allow_raw_credentials and aws.force_profile are mutually exclusive")]
    AwsBothSet,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct RawConfig {
    extra_commands: Vec<String>,
    readable_paths: Vec<String>,
    writable_paths: Vec<String>,
    git: GitConfig,
    runtimes: RuntimesConfig,
    aws: AwsConfig,
    local_binary_execution: LocalBinaryExecutionConfig,
    os_sandbox: bool,
}

/// Resolve a possibly-`~`-prefixed, possibly-relative path to an absolute one.
/// Does not require the path to exist — per `spec.md` §4.2, non-existent
/// suffixes are resolved lexically against the longest existing ancestor by
/// the path resolver, not here; this just produces the input to that step.
fn absolutize(raw: &str) -> PathBuf {
    let expanded = crate::utils::get_workspace_path(raw);
    if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    }
}

fn into_policy(raw: RawConfig) -> Result<PolicyConfig, ConfigParseError> {
    if raw.aws.allow_raw_credentials && raw.aws.force_profile.is_some() {
        return Err(ConfigParseError::AwsBothSet);
    }

    Ok(PolicyConfig {
        extra_commands: raw.extra_commands.into_iter().collect::<HashSet<_>>(),
        readable_paths: raw.readable_paths.iter().map(|p| absolutize(p)).collect(),
        writable_paths: raw.writable_paths.iter().map(|p| absolutize(p)).collect(),
        git: raw.git,
        runtimes: raw.runtimes,
        aws: raw.aws,
        local_binary_execution: raw.local_binary_execution,
        os_sandbox: raw.os_sandbox,
        sandbox: SandboxConfig::default(),
        runtime_detected_roots: Vec::new(),
    })
}

/// Parse the logical config shape from a YAML string.
pub fn parse_config(yaml: &str) -> Result<PolicyConfig, ConfigParseError> {
    let raw: RawConfig = serde_yaml_ng::from_str(yaml)?;
    into_policy(raw)
}

/// Load and parse a configuration file from disk.
pub fn load_config(path: &Path) -> Result<PolicyConfig, ConfigParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests;
