//! TTL key/value store trait for pluggable cache backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for expiring key/value backends (Redis or in-memory).
///
/// All values are serialized as strings (JSON). An entry whose TTL has
/// elapsed must be unreadable through every method, whether or not the
/// backend has physically removed it yet.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set (or overwrite) a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value only if the key does not already exist (NX).
    /// Returns `true` if the value was set, `false` if the key already existed.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Atomically read and delete a value. At most one concurrent caller
    /// observes `Some` for a given stored value.
    async fn take(&self, key: &str) -> AppResult<Option<String>>;

    /// Delete a key. Returns `true` if a live entry was removed.
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Check whether a live (unexpired) key exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Remaining time-to-live of a live key.
    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>>;

    /// Delete all keys matching a glob pattern (e.g., `"invite:*-<workspace>"`).
    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> AppResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Atomically take a typed value.
    async fn take_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> AppResult<Option<T>>
    where
        Self: Sized,
    {
        match self.take(key).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set(key, &json, ttl).await
    }
}
