//! Wire format for the worker transport (`spec.md` §4.8): a `u32`
//! big-endian length prefix followed by a `serde_json` body, in both
//! directions over the child's stdin/stdout.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub args: Vec<String>,
    pub dir: String,
    pub env: HashMap<String, String>,
    #[serde(rename = "stdinData")]
    pub stdin_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

/// Emitted by the worker binary exactly once at startup, before it reads
/// its first request frame, so the parent knows the child finished
/// initializing its OS-sandbox state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyFrame {
    pub ready: bool,
}

pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await
}

pub async fn read_frame<R, T>(reader: &mut R) -> std::io::Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = reader.read_u32().await?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    serde_json::from_slice(&buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests;
