//! Worker transport (`spec.md` §4.8): a single long-lived child process that
//! actually runs commands inside the OS sandbox, talked to over length-
//! prefixed JSON frames. One [`Worker`] serializes every request behind a
//! `tokio::sync::Mutex` (spec: "mutex-serialized"), restarting the child if
//! it has died since the last request.

pub mod protocol;

use crate::errors::SandboxError;
use protocol::{ReadyFrame, WorkerRequest, WorkerResponse};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

struct WorkerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

pub struct Worker {
    program: PathBuf,
    state: Mutex<Option<WorkerProcess>>,
}

impl Worker {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            state: Mutex::new(None),
        }
    }

    /// A live worker is dead if it has already exited; `try_wait` never
    /// blocks, so this is safe to call before every request.
    fn process_is_dead(proc: &mut WorkerProcess) -> bool {
        matches!(proc.child.try_wait(), Ok(Some(_)) | Err(_))
    }

    /// `spec.md`'s glossary: "the Sandbox exposes `isDead()`". True only once
    /// a worker has actually been spawned and subsequently exited; a worker
    /// that has never been used yet is not considered dead.
    pub async fn is_dead(&self) -> bool {
        let mut guard = self.state.lock().await;
        match guard.as_mut() {
            Some(proc) => Self::process_is_dead(proc),
            None => false,
        }
    }

    async fn spawn(&self) -> Result<WorkerProcess, SandboxError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::Worker(format!("failed to spawn worker: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxError::Worker("worker stdin not piped".to_string()))?;
        let stdout = BufReader::new(
            child
                .stdout
                .take()
                .ok_or_else(|| SandboxError::Worker("worker stdout not piped".to_string()))?,
        );

        let mut proc = WorkerProcess { child, stdin, stdout };
        let ready: ReadyFrame = protocol::read_frame(&mut proc.stdout)
            .await
            .map_err(|e| SandboxError::Worker(format!("worker did not send ready frame: {e}")))?;
        if !ready.ready {
            return Err(SandboxError::Worker("worker reported not-ready on startup".to_string()));
        }
        tracing::info!(program = %self.program.display(), "worker spawned and ready");
        Ok(proc)
    }

    /// Run one request end to end, restarting the child and retrying once if
    /// it was found dead beforehand or the pipe broke mid-exchange.
    pub async fn request(&self, req: WorkerRequest) -> Result<WorkerResponse, SandboxError> {
        let mut guard = self.state.lock().await;

        for attempt in 0..2 {
            let needs_restart = match guard.as_mut() {
                Some(proc) => Self::process_is_dead(proc),
                None => true,
            };
            if needs_restart {
                if guard.is_some() {
                    tracing::warn!("worker process found dead, restarting");
                }
                *guard = Some(self.spawn().await?);
            }

            let proc = guard.as_mut().expect("just ensured a live worker");
            let result = async {
                protocol::write_frame(&mut proc.stdin, &req)
                    .await
                    .map_err(|e| SandboxError::Worker(format!("failed to write request: {e}")))?;
                protocol::read_frame::<_, WorkerResponse>(&mut proc.stdout)
                    .await
                    .map_err(|e| SandboxError::Worker(format!("failed to read response: {e}")))
            }
            .await;

            match result {
                Ok(response) => return Ok(response),
                Err(err) => {
                    // The pipe is in an unknown state; drop it so a retry (or
                    // the next call) respawns rather than reusing it.
                    *guard = None;
                    if attempt == 1 {
                        return Err(err);
                    }
                    tracing::warn!(error = %err, "worker request failed, retrying once after respawn");
                }
            }
        }
        unreachable!("loop always returns within two attempts")
    }
}
