use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingSource {
    calls: AtomicUsize,
    expiration: SystemTime,
}

#[async_trait]
impl CredentialSource for CountingSource {
    async fn fetch(&self) -> Result<Credential, SandboxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Credential {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "token".to_string(),
            expiration: self.expiration,
        })
    }
}

#[tokio::test]
async fn fetches_once_and_reuses_a_fresh_credential() {
    let source = Arc::new(CountingSource {
        calls: AtomicUsize::new(0),
        expiration: SystemTime::now() + Duration::from_secs(3600),
    });
    let cache = CredentialCache::with_source(source.clone());

    cache.get().await.unwrap();
    cache.get().await.unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refreshes_when_within_the_skew_window_of_expiry() {
    let source = Arc::new(CountingSource {
        calls: AtomicUsize::new(0),
        expiration: SystemTime::now() + Duration::from_secs(60),
    });
    let cache = CredentialCache::with_source(source.clone());

    cache.get().await.unwrap();
    cache.get().await.unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fetch_failure_propagates_as_an_error() {
    struct FailingSource;
    #[async_trait]
    impl CredentialSource for FailingSource {
        async fn fetch(&self) -> Result<Credential, SandboxError> {
            Err(SandboxError::Worker("boom".to_string()))
        }
    }
    let cache = CredentialCache::with_source(Arc::new(FailingSource));
    assert!(cache.get().await.is_err());
}
