//! `spec.md` §4.6: the aggregator that wires the validator, path checker,
//! script-transitive validator, interpreter, worker, and (for `aws`-enabled
//! policy) IMDS server together behind the two public operations,
//! `validate` and `execute`.

use crate::config::{AwsMode, ConfigStore, PolicyConfig};
use crate::deadline::Deadline;
use crate::errors::SandboxError;
use crate::interp::hooks::{CallHandler, ExecContext, ExecHandler, ExecOutcome, OpenHandler};
use crate::interp::{nested, Interpreter};
use crate::worker::protocol::WorkerRequest;
use crate::worker::Worker;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Combined stdout+stderr is capped the same way the teacher's `ExecTool`
/// bounds its own captured output, to keep one runaway command from
/// exhausting memory.
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

fn parse(text: &str) -> Result<brush_parser::ast::Program, SandboxError> {
    let cursor = std::io::Cursor::new(text);
    let reader = std::io::BufReader::new(cursor);
    let options = brush_parser::ParserOptions::default();
    let source_info = brush_parser::SourceInfo::default();
    let mut parser = brush_parser::Parser::new(reader, &options, &source_info);
    parser
        .parse_program()
        .map_err(|e| SandboxError::Parse(e.to_string()))
}

fn truncate_combined(mut stdout: Vec<u8>, stderr: Vec<u8>) -> Vec<u8> {
    stdout.extend_from_slice(&stderr);
    if stdout.len() > MAX_OUTPUT_BYTES {
        stdout.truncate(MAX_OUTPUT_BYTES);
        stdout.extend_from_slice(b"\n[output truncated at 1MB]");
    }
    stdout
}

/// Implements all three interpreter hooks for one `execute`/`validate`
/// call. Path checks consult the caller-supplied roots directly (the same
/// values threaded into the `Interpreter`); `exec` dispatches on command
/// name per `spec.md` §4.6's ExecHandler bullet list.
struct SandboxHandlers {
    config: Arc<PolicyConfig>,
    read_roots: Vec<PathBuf>,
    write_roots: Vec<PathBuf>,
    worker: Arc<Worker>,
}

impl CallHandler for SandboxHandlers {
    fn on_call(&self, name: &str, args: &[String], work_dir: &Path) -> Result<(), SandboxError> {
        crate::path::check_call_args(name, args, work_dir, &self.read_roots, &self.write_roots)
    }
}

impl OpenHandler for SandboxHandlers {
    fn on_open(&self, path: &Path, for_write: bool, _work_dir: &Path) -> Result<(), SandboxError> {
        crate::path::check_open_path(path, for_write, &self.read_roots, &self.write_roots)
    }
}

impl SandboxHandlers {
    fn as_handlers(self: &Arc<Self>) -> (Arc<dyn CallHandler>, Arc<dyn OpenHandler>, Arc<dyn ExecHandler>) {
        (self.clone(), self.clone(), self.clone())
    }

    async fn exec_awk(&self, ctx: &ExecContext<'_>, args: &[String]) -> Result<ExecOutcome, SandboxError> {
        // The static validator already restricts awk invocations to
        // `-f`/`-v`/`-F` (no `system()`, command pipes, or file writes);
        // re-check any `-f` script path against the read roots before
        // letting the real `awk` binary touch it.
        let mut i = 0;
        while i < args.len() {
            if args[i] == "-f" {
                if let Some(script) = args.get(i + 1) {
                    let resolved = crate::path::resolve(script, ctx.work_dir);
                    crate::path::check_open_path(&resolved, false, ctx.read_roots, ctx.write_roots)?;
                }
                i += 2;
            } else {
                i += 1;
            }
        }
        self.spawn_local("awk", args, ctx).await
    }

    async fn spawn_local(&self, name: &str, args: &[String], ctx: &ExecContext<'_>) -> Result<ExecOutcome, SandboxError> {
        use std::process::Stdio;
        use tokio::io::AsyncWriteExt;

        let mut cmd = crate::utils::subprocess::scrubbed_command(name);
        cmd.args(args);
        cmd.current_dir(ctx.work_dir);
        cmd.envs(ctx.env);
        cmd.kill_on_drop(true);
        cmd.stdin(if ctx.stdin_data.is_some() { Stdio::piped() } else { Stdio::null() });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| SandboxError::SetupIo(format!("failed to spawn {name}: {e}")))?;

        if let Some(data) = ctx.stdin_data {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(data).await;
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SandboxError::SetupIo(format!("failed to run {name}: {e}")))?;

        Ok(ExecOutcome {
            output: truncate_combined(output.stdout, output.stderr),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn dispatch_to_worker(&self, ctx: &ExecContext<'_>, name: &str, args: &[String]) -> Result<ExecOutcome, SandboxError> {
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(name.to_string());
        full_args.extend(args.iter().cloned());
        let req = WorkerRequest {
            args: full_args,
            dir: ctx.work_dir.display().to_string(),
            env: ctx.env.clone(),
            stdin_data: ctx.stdin_data.map(<[u8]>::to_vec),
        };
        let resp = self.worker.request(req).await?;
        if let Some(message) = resp.error_message {
            return Err(SandboxError::Worker(message));
        }
        Ok(ExecOutcome {
            output: truncate_combined(resp.stdout, resp.stderr),
            exit_code: resp.exit_code,
        })
    }
}

#[async_trait]
impl ExecHandler for SandboxHandlers {
    async fn exec(&self, ctx: &ExecContext<'_>, name: &str, args: &[String]) -> Result<ExecOutcome, SandboxError> {
        if name == "awk" {
            return self.exec_awk(ctx, args).await;
        }

        if crate::shell::is_script_path_form(name) {
            let resolved = crate::path::resolve(name, ctx.work_dir);
            crate::path::check_open_path(&resolved, false, ctx.read_roots, ctx.write_roots)?;

            if !self.config.local_binary_execution.enabled {
                return Err(SandboxError::validation(
                    "local-binary-execution",
                    name.to_string(),
                    "script-path invocation requires localBinaryExecution.enabled",
                ));
            }

            if crate::binary_magic::is_compiled_binary(&resolved) {
                return self.dispatch_to_worker(ctx, name, args).await;
            }

            let handlers = self.as_handlers();
            return nested::run_script_path_form(
                &self.config,
                ctx.work_dir,
                ctx.read_roots,
                ctx.write_roots,
                handlers.0,
                handlers.1,
                handlers.2,
                ctx.env.clone(),
                &resolved,
                args,
                ctx.nested_depth + 1,
                ctx.deadline,
            )
            .await;
        }

        if self.config.os_sandbox {
            self.dispatch_to_worker(ctx, name, args).await
        } else {
            self.spawn_local(name, args, ctx).await
        }
    }
}

/// Lazily-started IMDS server handle plus the address the interpreter's
/// environment should point `AWS_EC2_METADATA_SERVICE_ENDPOINT` at.
struct ImdsHandle {
    #[allow(dead_code)]
    task: tokio::task::JoinHandle<()>,
    addr: std::net::SocketAddr,
}

pub struct Sandbox {
    config: Arc<ConfigStore>,
    worker: Arc<Worker>,
    imds: Mutex<Option<ImdsHandle>>,
}

impl Sandbox {
    pub fn new(config: Arc<ConfigStore>, worker_program: PathBuf) -> Self {
        Self {
            config,
            worker: Arc::new(Worker::new(worker_program)),
            imds: Mutex::new(None),
        }
    }

    /// `spec.md`'s "Sandbox exposes `isDead()`": true once the worker's
    /// underlying child process has been found dead and not yet replaced by
    /// a subsequent request.
    pub async fn is_worker_dead(&self) -> bool {
        self.worker.is_dead().await
    }

    async fn ensure_imds(&self, profile: &str) -> Result<std::net::SocketAddr, SandboxError> {
        {
            let guard = self.imds.lock().expect("imds lock poisoned");
            if let Some(handle) = guard.as_ref() {
                return Ok(handle.addr);
            }
        }
        let (task, addr) = crate::imds::spawn(profile.to_string())
            .await
            .map_err(|e| SandboxError::SetupIo(format!("failed to start imds server: {e}")))?;
        let mut guard = self.imds.lock().expect("imds lock poisoned");
        let addr = guard.get_or_insert(ImdsHandle { task, addr }).addr;
        Ok(addr)
    }

    /// `spec.md` §4.6 step 1-3: parse, collect declared functions, then run
    /// the shell-AST validator and the path/script-transitive checks. No I/O
    /// beyond reading script files the command itself references — still
    /// bounded by `deadline`, since a command can reference deeply nested
    /// scripts (up to [`crate::script::MAX_DEPTH`]) each requiring a file read.
    pub fn validate(
        &self,
        command: &str,
        work_dir: &Path,
        read_roots: &[PathBuf],
        write_roots: &[PathBuf],
        deadline: Option<std::time::Duration>,
    ) -> Result<(), SandboxError> {
        let deadline = deadline.map_or_else(Deadline::none, Deadline::after);
        let config = self.config.load();
        let program = parse(command)?;
        let declared = crate::script::collect_functions_transitive(&program, work_dir);
        crate::script::validate_script_contents(
            &program,
            work_dir,
            read_roots,
            write_roots,
            &config,
            &declared,
            0,
            deadline,
        )
    }

    /// `spec.md` §4.6 step 4-5: build an interpreter configured with the
    /// three hooks and run it, returning combined stdout+stderr. Non-exit
    /// errors are already distinguishable from `SandboxError::ExitCode` by
    /// variant, satisfying the "runtime-error marker" requirement without a
    /// separate wrapper type.
    ///
    /// `deadline`, if set, is `spec.md` §5's cancellation signal: the
    /// interpreter aborts at the next suspension point (open, spawn, read,
    /// write) once it elapses, and `SandboxError::DeadlineExceeded` carries
    /// whatever output had already been produced.
    pub async fn execute(
        &self,
        command: &str,
        work_dir: &Path,
        read_roots: &[PathBuf],
        write_roots: &[PathBuf],
        deadline: Option<std::time::Duration>,
    ) -> Result<Vec<u8>, SandboxError> {
        let deadline = deadline.map_or_else(Deadline::none, Deadline::after);
        let config = self.config.load();
        let program = parse(command)?;
        let declared = crate::script::collect_functions_transitive(&program, work_dir);
        crate::script::validate_script_contents(
            &program,
            work_dir,
            read_roots,
            write_roots,
            &config,
            &declared,
            0,
            deadline,
        )?;

        let mut env: HashMap<String, String> = crate::utils::subprocess::scrubbed_env();
        if let AwsMode::ImdsProfile(profile) = config.aws.mode() {
            let addr = self.ensure_imds(&profile).await?;
            env.insert("AWS_EC2_METADATA_SERVICE_ENDPOINT".to_string(), format!("http://{addr}/"));
        }

        let handlers = Arc::new(SandboxHandlers {
            config: config.clone(),
            read_roots: read_roots.to_vec(),
            write_roots: write_roots.to_vec(),
            worker: self.worker.clone(),
        });

        let mut interp = Interpreter::new(
            work_dir.to_path_buf(),
            env,
            read_roots.to_vec(),
            write_roots.to_vec(),
            0,
            config,
            deadline,
            handlers.clone(),
            handlers.clone(),
            handlers,
        );
        interp.run(&program).await?;
        let output = interp.take_output();
        if interp.exit_code() != 0 {
            return Err(SandboxError::ExitCode(interp.exit_code()));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests;
