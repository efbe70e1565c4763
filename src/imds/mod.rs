//! IMDS credential server (`spec.md` §4.9): a minimal localhost-bound HTTP
//! server exposing the three IMDSv2 routes the `aws` CLI family expects,
//! backed by a [`cache::CredentialCache`]. Session tokens are opaque,
//! in-memory only, and never touch the sandboxed process's filesystem.

pub mod cache;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use cache::CredentialCache;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const ROLE_NAME: &str = "sandboxed-role";
const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const TTL_MIN: u64 = 1;
const TTL_MAX: u64 = 21_600;
const TTL_DEFAULT: u64 = 21_600;

struct SessionStore {
    tokens: Mutex<HashMap<String, SystemTime>>,
}

impl SessionStore {
    fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    async fn issue(&self, ttl: Duration) -> String {
        let mut raw = [0u8; 32];
        OsRng.fill_bytes(&mut raw);
        let token = hex::encode(raw);
        self.tokens
            .lock()
            .await
            .insert(token.clone(), SystemTime::now() + ttl);
        token
    }

    /// Validates a token, evicting it (and anything else already expired)
    /// lazily rather than running a background sweep.
    async fn is_live(&self, token: &str) -> bool {
        let now = SystemTime::now();
        let mut tokens = self.tokens.lock().await;
        tokens.retain(|_, expiry| *expiry > now);
        tokens.contains_key(token)
    }
}

#[derive(Clone)]
struct ImdsState {
    sessions: Arc<SessionStore>,
    credentials: Arc<CredentialCache>,
}

#[derive(Serialize)]
struct SecurityCredentialsResponse {
    #[serde(rename = "Code")]
    code: &'static str,
    #[serde(rename = "LastUpdated")]
    last_updated: String,
    #[serde(rename = "Type")]
    credential_type: &'static str,
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "Expiration")]
    expiration: String,
}

fn build_router(state: ImdsState) -> Router {
    Router::new()
        .route("/latest/api/token", put(token_handler))
        .route(
            "/latest/meta-data/iam/security-credentials/",
            get(role_name_handler),
        )
        .route(
            "/latest/meta-data/iam/security-credentials/{role}",
            get(credentials_handler),
        )
        .with_state(state)
}

async fn token_handler(State(state): State<ImdsState>, headers: HeaderMap) -> impl IntoResponse {
    let ttl = headers
        .get(TTL_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(TTL_DEFAULT)
        .clamp(TTL_MIN, TTL_MAX);

    let token = state.sessions.issue(Duration::from_secs(ttl)).await;
    (StatusCode::OK, token)
}

async fn require_session(state: &ImdsState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if state.sessions.is_live(token).await {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn role_name_handler(
    State(state): State<ImdsState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match require_session(&state, &headers).await {
        Ok(()) => (StatusCode::OK, ROLE_NAME.to_string()).into_response(),
        Err(status) => status.into_response(),
    }
}

async fn credentials_handler(
    State(state): State<ImdsState>,
    axum::extract::Path(role): axum::extract::Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(status) = require_session(&state, &headers).await {
        return status.into_response();
    }
    if role != ROLE_NAME {
        return StatusCode::NOT_FOUND.into_response();
    }

    let credential = match state.credentials.get().await {
        Ok(c) => c,
        Err(err) => {
            tracing::warn!(error = %err, "imds credential fetch failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let expiration: chrono::DateTime<chrono::Utc> = credential.expiration.into();
    let body = SecurityCredentialsResponse {
        code: "Success",
        last_updated: chrono::Utc::now().to_rfc3339(),
        credential_type: "AWS-HMAC",
        access_key_id: credential.access_key_id,
        secret_access_key: credential.secret_access_key,
        token: credential.session_token,
        expiration: expiration.to_rfc3339(),
    };
    Json(body).into_response()
}

/// Spawns the server bound to an ephemeral localhost port and returns its
/// actual bound address alongside the task running it.
pub async fn spawn(profile: String) -> std::io::Result<(JoinHandle<()>, SocketAddr)> {
    let state = ImdsState {
        sessions: Arc::new(SessionStore::new()),
        credentials: Arc::new(CredentialCache::new(profile)),
    };
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "imds credential server listening");

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "imds server error");
        }
    });

    Ok((handle, addr))
}
