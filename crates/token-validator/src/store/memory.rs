//! Process-local TTL store.

use super::{KeyStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory [`KeyStore`] with per-entry expiry.
///
/// Expired entries read as absent. They are evicted when read, and every
/// write sweeps all expired entries from the map.
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = InMemoryKeyStore::new();
        assert_eq!(store.get("jwk:kid1").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = InMemoryKeyStore::new();
        store
            .set("jwk:kid1", "null".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("jwk:kid1").await.unwrap().as_deref(), Some("null"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = InMemoryKeyStore::new();
        store.set("k", "first".to_string(), Duration::from_secs(60)).await.unwrap();
        store.set("k", "second".to_string(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let store = InMemoryKeyStore::new();
        store
            .set("k", "value".to_string(), Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_write_sweeps_expired_entries() {
        let store = InMemoryKeyStore::new();
        for i in 0..1_000 {
            store
                .set(&format!("jwk:random-{i}"), "null".to_string(), Duration::from_millis(1))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        store
            .set("jwk:kid1", "null".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.entries.lock().await.len(), 1);
        assert_eq!(store.get("jwk:kid1").await.unwrap().as_deref(), Some("null"));
    }
}
