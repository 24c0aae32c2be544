//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use seatkeeper_core::config::cache::RedisCacheConfig;
use seatkeeper_core::error::{AppError, ErrorKind};
use seatkeeper_core::result::AppResult;

/// Reconnecting Redis connection plus the namespace every key lives under.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
    key_prefix: String,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisClient {
    /// Open a managed connection.
    pub async fn connect(config: &RedisCacheConfig) -> AppResult<Self> {
        info!(url = %redact_url(&config.url), prefix = %config.key_prefix, "Connecting to Redis");

        let client = Client::open(config.url.as_str())
            .map_err(|e| AppError::with_source(ErrorKind::Cache, "Invalid Redis URL", e))?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(ErrorKind::ServiceUnavailable, "Redis is unreachable", e)
        })?;

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// A connection handle; clones share the underlying multiplexed connection.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Namespace a logical key.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://****{}", &url[..scheme], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("redis://:s3cret@cache:6379/0"),
            "redis://****@cache:6379/0"
        );
        assert_eq!(redact_url("redis://cache:6379"), "redis://cache:6379");
    }
}
