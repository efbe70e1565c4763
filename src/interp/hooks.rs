//! The three installed hooks described in `spec.md` §4.6: `CallHandler`,
//! `OpenHandler`, `ExecHandler`. `brush_parser` has no execution engine of
//! its own to hang these off of, so [`super::Interpreter`] is the thing that
//! actually calls them at the right points while walking the AST.

use crate::deadline::Deadline;
use crate::errors::SandboxError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Re-checks a call's fully runtime-expanded argument vector before it
/// runs, the way §4.2 checks the statically literal-view'd one.
pub trait CallHandler: Send + Sync {
    fn on_call(&self, name: &str, args: &[String], work_dir: &Path) -> Result<(), SandboxError>;
}

/// Gates every file open by read/write intent, independent of which command
/// is doing the opening (a command's own argument-level path checks cover
/// the common case; this is the last line of defense for paths that only
/// become concrete once the interpreter itself resolves them).
pub trait OpenHandler: Send + Sync {
    fn on_open(&self, path: &Path, for_write: bool, work_dir: &Path) -> Result<(), SandboxError>;
}

/// What an external command produced.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub output: Vec<u8>,
    pub exit_code: i32,
}

/// Context handed to [`ExecHandler::exec`] for one external command
/// invocation: enough to build and run (or delegate) the process without
/// threading every field through the call signature.
pub struct ExecContext<'a> {
    pub work_dir: &'a Path,
    pub env: &'a std::collections::HashMap<String, String>,
    pub read_roots: &'a [PathBuf],
    pub write_roots: &'a [PathBuf],
    pub nested_depth: u32,
    pub stdin_data: Option<&'a [u8]>,
    /// The spawn/worker round-trip this context is handed to should race
    /// against this deadline rather than block indefinitely.
    pub deadline: Deadline,
}

/// Dispatches an external command: nested `bash`/`sh`, `awk`, a script-path
/// invocation, or (depending on `os_sandbox`) the worker or a local spawn.
#[async_trait]
pub trait ExecHandler: Send + Sync {
    async fn exec(
        &self,
        ctx: &ExecContext<'_>,
        name: &str,
        args: &[String],
    ) -> Result<ExecOutcome, SandboxError>;
}
