//! External cache store collaborator.
//!
//! The key cache only needs `get` and `set`-with-expiry on string values.
//! Entries are never deleted explicitly; they age out per the store's TTL.
//!
//! - [`InMemoryKeyStore`]: process-local TTL map
//! - [`RedisKeyStore`]: shared store across processes

mod memory;
mod redis_store;

pub use self::memory::InMemoryKeyStore;
pub use self::redis_store::RedisKeyStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a cache store.
///
/// These never reach the caller of `validate`: the key cache treats a failed
/// read as a miss and a failed write as "not cached".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cache store connection failed: {0}")]
    Connection(String),

    #[error("Cache store command failed: {0}")]
    Command(String),

    #[error("Cache store command timed out")]
    Timeout,
}

/// Get / set-with-expiry string store.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Read a value; `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value that expires after `ttl`. Last write wins.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
}
