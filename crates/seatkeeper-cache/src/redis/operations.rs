//! Redis-backed TTL store.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use seatkeeper_core::error::{AppError, ErrorKind};
use seatkeeper_core::result::AppResult;
use seatkeeper_core::traits::cache::CacheProvider;

use super::client::RedisClient;

/// Number of keys requested per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// TTL store on Redis. Expiry is enforced by the server.
#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    client: RedisClient,
}

impl RedisCacheProvider {
    /// Wrap a connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn map_err(e: redis::RedisError) -> AppError {
        let kind = if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
            ErrorKind::ServiceUnavailable
        } else {
            ErrorKind::Cache
        };
        AppError::with_source(kind, format!("Redis error: {e}"), e)
    }

    /// Millisecond TTL argument; Redis rejects zero.
    fn ttl_millis(ttl: Duration) -> u64 {
        (ttl.as_millis() as u64).max(1)
    }
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.conn_mut();
        conn.get(self.client.prefixed_key(key))
            .await
            .map_err(Self::map_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let _: () = redis::cmd("SET")
            .arg(self.client.prefixed_key(key))
            .arg(value)
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let result: Option<String> = redis::cmd("SET")
            .arg(self.client.prefixed_key(key))
            .arg(value)
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(result.is_some())
    }

    async fn take(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.conn_mut();
        redis::cmd("GETDEL")
            .arg(self.client.prefixed_key(key))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let removed: i64 = conn
            .del(self.client.prefixed_key(key))
            .await
            .map_err(Self::map_err)?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        conn.exists(self.client.prefixed_key(key))
            .await
            .map_err(Self::map_err)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let mut conn = self.client.conn_mut();
        let millis: i64 = redis::cmd("PTTL")
            .arg(self.client.prefixed_key(key))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        // -2: missing, -1: no expiry (never written by this store).
        Ok((millis >= 0).then(|| Duration::from_millis(millis as u64)))
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        let full_pattern = self.client.prefixed_key(pattern);
        let mut conn = self.client.conn_mut();

        let mut cursor: u64 = 0;
        let mut count = 0u64;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&full_pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(Self::map_err)?;

            if !keys.is_empty() {
                let removed: i64 = conn.del(&keys).await.map_err(Self::map_err)?;
                count += removed.max(0) as u64;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern, count, "Deleted keys matching pattern");
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
