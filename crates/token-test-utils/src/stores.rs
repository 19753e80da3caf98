//! Key store doubles for cache tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use token_validator::store::{InMemoryKeyStore, KeyStore, StoreError};
use tokio::sync::Mutex;

/// In-memory store that counts calls and remembers the last TTL written.
#[derive(Default)]
pub struct CountingKeyStore {
    inner: InMemoryKeyStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
    last_ttl: Mutex<Option<Duration>>,
}

impl CountingKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub async fn last_ttl(&self) -> Option<Duration> {
        *self.last_ttl.lock().await
    }

    /// Raw stored value, bypassing the counters.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.ok().flatten()
    }

    /// Seed a value, bypassing the counters.
    pub async fn seed(&self, key: &str, value: &str, ttl: Duration) {
        let _ = self.inner.set(key, value.to_string(), ttl).await;
    }
}

#[async_trait]
impl KeyStore for CountingKeyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        *self.last_ttl.lock().await = Some(ttl);
        self.inner.set(key, value, ttl).await
    }
}

/// Store whose every command fails.
#[derive(Debug, Default)]
pub struct FailingKeyStore;

#[async_trait]
impl KeyStore for FailingKeyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Timeout)
    }
}
