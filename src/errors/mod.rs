use thiserror::Error;
use std::path::PathBuf;

/// Typed error hierarchy for the sandbox core.
///
/// Use at module boundaries (`validate`, `execute`, the IMDS server, the
/// worker transport). Internal/leaf functions continue to return
/// `anyhow::Result` — the `Internal` variant allows seamless conversion via
/// the `?` operator.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to parse command: {0}")]
    Parse(String),

    #[error("{rule}: {detail} (offending literal: {literal:?})")]
    Validation {
        rule: String,
        literal: String,
        detail: String,
    },

    #[error("path '{literal}' resolves to '{resolved}', which is outside allowed directories")]
    PathBoundary { literal: String, resolved: PathBuf },

    #[error("script '{}': {source}", script_path.display())]
    ScriptTransitive {
        script_path: PathBuf,
        #[source]
        source: Box<SandboxError>,
    },

    #[error("command exited with status {0}")]
    ExitCode(i32),

    #[error("command failed to run (retry without sandbox may succeed): {0}")]
    SetupIo(String),

    #[error("deadline exceeded")]
    DeadlineExceeded { partial_output: Vec<u8> },

    #[error("worker communication failure: {0}")]
    Worker(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SandboxError {
    /// Whether this represents "ran but failed" rather than "could not run".
    pub fn is_exit_code(&self) -> bool {
        matches!(self, Self::ExitCode(_))
    }

    pub fn validation(rule: impl Into<String>, literal: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation {
            rule: rule.into(),
            literal: literal.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests;
