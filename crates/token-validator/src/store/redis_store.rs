//! Redis-backed key store.
//!
//! # Key Patterns
//!
//! - `<prefix><kid>` - JSON encoded key descriptor or `null`, set with `EX <ttl>`
//!
//! # Connection Pattern
//!
//! The redis-rs `MultiplexedConnection` is cheap to clone and safe to use
//! concurrently, so each command clones it instead of locking.

use super::{KeyStore, StoreError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::time::Duration;
use tracing::instrument;

/// Shared [`KeyStore`] backed by Redis.
#[derive(Clone)]
pub struct RedisKeyStore {
    connection: MultiplexedConnection,
    command_timeout: Duration,
}

impl RedisKeyStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the URL is invalid or the server is
    /// unreachable, `StoreError::Timeout` if connecting exceeds `command_timeout`.
    pub async fn connect(
        redis_url: &SecretString,
        command_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::open(redis_url.expose_secret()).map_err(|e| {
            // Note: Do NOT log redis_url as it may contain credentials
            tracing::error!(target: "tv.store", error = %e, "Failed to open Redis client");
            StoreError::Connection(e.to_string())
        })?;

        let connection = tokio::time::timeout(
            command_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| StoreError::Timeout)?
        .map_err(|e| {
            tracing::error!(target: "tv.store", error = %e, "Failed to connect to Redis");
            StoreError::Connection(e.to_string())
        })?;

        tracing::info!(target: "tv.store", "Connected to Redis key store");

        Ok(Self {
            connection,
            command_timeout,
        })
    }

    async fn bounded<T>(
        &self,
        command: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.command_timeout, command)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(|e| StoreError::Command(e.to_string()))
    }
}

#[async_trait]
impl KeyStore for RedisKeyStore {
    #[instrument(skip_all)]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        self.bounded(conn.get::<_, Option<String>>(key)).await
    }

    #[instrument(skip_all)]
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        // Redis rejects EX 0
        let seconds = ttl.as_secs().max(1);
        self.bounded(conn.set_ex::<_, _, ()>(key, value, seconds)).await
    }
}
