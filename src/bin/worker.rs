//! `safeshell-worker`: the long-lived child process `spec.md` §4.8 describes.
//!
//! Applies Landlock (Linux) / Seatbelt (macOS) restrictions to each command it
//! runs, reads one length-prefixed [`safeshell::worker::protocol::WorkerRequest`]
//! at a time from stdin, and writes back a matching `WorkerResponse`. Emits a
//! single `ReadyFrame` before reading its first request so the parent knows
//! sandbox setup didn't fail silently.

use safeshell::config::{PolicyConfig, SandboxConfig};
use safeshell::utils::sandbox::{apply_to_command, SandboxRules};
use safeshell::worker::protocol::{self, ReadyFrame, WorkerRequest, WorkerResponse};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::process::Command;

const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

fn truncate_combined(mut stdout: Vec<u8>, stderr: Vec<u8>) -> Vec<u8> {
    stdout.extend_from_slice(&stderr);
    if stdout.len() > MAX_OUTPUT_BYTES {
        stdout.truncate(MAX_OUTPUT_BYTES);
        stdout.extend_from_slice(b"\n[output truncated at 1MB]");
    }
    stdout
}

fn load_sandbox_config() -> SandboxConfig {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    config_path
        .and_then(|path| safeshell::config::load_config(&path).ok())
        .map(|policy: PolicyConfig| policy.sandbox)
        .unwrap_or_default()
}

async fn run_one(req: WorkerRequest, sandbox_config: &SandboxConfig) -> WorkerResponse {
    let Some(program) = req.args.first() else {
        return WorkerResponse {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: -1,
            error_message: Some("empty argument vector".to_string()),
        };
    };

    let work_dir = Path::new(&req.dir);
    let mut cmd = Command::new(program);
    cmd.args(&req.args[1..]);
    cmd.current_dir(work_dir);
    cmd.env_clear();
    cmd.envs(&req.env);
    cmd.kill_on_drop(true);
    cmd.stdin(if req.stdin_data.is_some() { Stdio::piped() } else { Stdio::null() });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    if sandbox_config.enabled {
        let rules = SandboxRules::for_shell(work_dir, sandbox_config);
        if let Err(e) = apply_to_command(&mut cmd, &rules) {
            return WorkerResponse {
                stdout: Vec::new(),
                stderr: Vec::new(),
                exit_code: -1,
                error_message: Some(format!("failed to apply sandbox rules: {e}")),
            };
        }
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return WorkerResponse {
                stdout: Vec::new(),
                stderr: Vec::new(),
                exit_code: -1,
                error_message: Some(format!("failed to spawn {program}: {e}")),
            };
        }
    };

    if let Some(data) = &req.stdin_data {
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(data).await;
        }
    }

    match child.wait_with_output().await {
        Ok(output) => {
            let exit_code = output.status.code().unwrap_or(-1);
            WorkerResponse {
                stdout: truncate_combined(output.stdout, output.stderr),
                stderr: Vec::new(),
                exit_code,
                error_message: None,
            }
        }
        Err(e) => WorkerResponse {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: -1,
            error_message: Some(format!("failed to run {program}: {e}")),
        },
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".parse().unwrap());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let sandbox_config = load_sandbox_config();
    let mut stdin: BufReader<Stdin> = BufReader::new(tokio::io::stdin());
    let mut stdout: Stdout = tokio::io::stdout();

    protocol::write_frame(&mut stdout, &ReadyFrame { ready: true }).await?;

    loop {
        let req: WorkerRequest = match protocol::read_frame(&mut stdin).await {
            Ok(req) => req,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };

        let response = run_one(req, &sandbox_config).await;
        protocol::write_frame(&mut stdout, &response).await?;
    }

    Ok(())
}
