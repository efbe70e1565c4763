//! Credential cache backing the IMDS server (`spec.md` §4.9). Holds one
//! credential fetched for the configured profile, refreshed no later than
//! 5 minutes before it expires, under a mutex with its own fetch timeout so
//! a slow fetch never blocks on a caller-scoped cancellation signal.

use crate::errors::SandboxError;
use crate::utils::subprocess::scrubbed_command;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

const REFRESH_SKEW: Duration = Duration::from_secs(5 * 60);
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: SystemTime,
}

/// Shape of `aws configure export-credentials --profile <p> --format process`,
/// the AWS CLI's own stable JSON contract for handing credentials to another
/// process. `Expiration` is RFC 3339; CLI versions disagree on omitting it
/// for non-expiring credentials, so it's optional here.
#[derive(Debug, Deserialize)]
struct ExportedCredentials {
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "SessionToken")]
    session_token: Option<String>,
    #[serde(rename = "Expiration")]
    expiration: Option<String>,
}

/// Where a fresh [`Credential`] comes from. Abstracted so the cache's
/// refresh/skew logic can be tested without shelling out to the real `aws`
/// binary.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self) -> Result<Credential, SandboxError>;
}

/// Fetches via `aws configure export-credentials`, the AWS CLI's own
/// process-credential contract, for the profile named in policy.
pub struct AwsCliSource {
    pub profile: String,
}

#[async_trait]
impl CredentialSource for AwsCliSource {
    async fn fetch(&self) -> Result<Credential, SandboxError> {
        let mut cmd = scrubbed_command("aws");
        cmd.args([
            "configure",
            "export-credentials",
            "--profile",
            &self.profile,
            "--format",
            "process",
        ]);
        let output = tokio::time::timeout(FETCH_TIMEOUT, cmd.output())
            .await
            .map_err(|_| SandboxError::Worker("credential fetch timed out".to_string()))?
            .map_err(|e| SandboxError::Worker(format!("failed to spawn aws cli: {e}")))?;

        if !output.status.success() {
            return Err(SandboxError::Worker(format!(
                "aws configure export-credentials exited with {}",
                output.status
            )));
        }

        let parsed: ExportedCredentials = serde_json::from_slice(&output.stdout)
            .map_err(|e| SandboxError::Worker(format!("unparsable credential export: {e}")))?;

        let expiration = parsed
            .expiration
            .and_then(|raw| chrono::DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| SystemTime::UNIX_EPOCH + Duration::from_secs(dt.timestamp().max(0) as u64))
            .unwrap_or_else(|| SystemTime::now() + Duration::from_secs(3600));

        Ok(Credential {
            access_key_id: parsed.access_key_id,
            secret_access_key: parsed.secret_access_key,
            session_token: parsed.session_token.unwrap_or_default(),
            expiration,
        })
    }
}

pub struct CredentialCache {
    source: Arc<dyn CredentialSource>,
    current: Mutex<Option<Credential>>,
}

impl CredentialCache {
    pub fn new(profile: String) -> Self {
        Self::with_source(Arc::new(AwsCliSource { profile }))
    }

    pub fn with_source(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            source,
            current: Mutex::new(None),
        }
    }

    /// Returns the cached credential, refreshing it first if it is within
    /// `REFRESH_SKEW` of expiring (or there is none cached yet).
    pub async fn get(&self) -> Result<Credential, SandboxError> {
        let mut guard = self.current.lock().await;
        let needs_refresh = match guard.as_ref() {
            Some(cred) => SystemTime::now() + REFRESH_SKEW >= cred.expiration,
            None => true,
        };
        if needs_refresh {
            let fresh = self.source.fetch().await?;
            *guard = Some(fresh.clone());
            return Ok(fresh);
        }
        Ok(guard.as_ref().expect("just checked Some").clone())
    }
}

#[cfg(test)]
mod tests;
