//! TTL store manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use seatkeeper_core::config::cache::CacheConfig;
use seatkeeper_core::error::AppError;
use seatkeeper_core::result::AppResult;
use seatkeeper_core::traits::cache::CacheProvider;

/// Handle to the configured TTL store.
///
/// Cloning is cheap; every clone shares the same backend.
#[derive(Debug, Clone)]
pub struct CacheManager {
    inner: Arc<dyn CacheProvider>,
    #[cfg(feature = "memory")]
    memory: Option<crate::memory::MemoryCacheProvider>,
}

impl CacheManager {
    /// Build the provider named by `config.provider`.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Using Redis TTL store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Ok(Self::from_provider(Arc::new(
                    crate::redis::RedisCacheProvider::new(client),
                )))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!(
                    max_capacity = config.memory.max_capacity,
                    "Using in-memory TTL store"
                );
                Ok(Self::in_memory(crate::memory::MemoryCacheProvider::new(
                    &config.memory,
                )))
            }
            other => Err(AppError::configuration(format!(
                "Unknown cache provider: '{other}'. Supported: memory, redis"
            ))),
        }
    }

    /// Wrap an existing provider.
    pub fn from_provider(provider: Arc<dyn CacheProvider>) -> Self {
        Self {
            inner: provider,
            #[cfg(feature = "memory")]
            memory: None,
        }
    }

    /// Wrap an in-memory provider, keeping access to its sweeper.
    #[cfg(feature = "memory")]
    pub fn in_memory(provider: crate::memory::MemoryCacheProvider) -> Self {
        Self {
            inner: Arc::new(provider.clone()),
            memory: Some(provider),
        }
    }

    /// Start the expired-entry sweeper when the backend needs one.
    ///
    /// Redis expires keys server-side, so this returns `None` for it.
    pub fn spawn_sweeper(&self, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        #[cfg(feature = "memory")]
        if let Some(memory) = &self.memory {
            return Some(memory.spawn_sweeper(shutdown));
        }
        let _ = shutdown;
        None
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.set_nx(key, value, ttl).await
    }

    async fn take(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.take(key).await
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        self.inner.ttl(key).await
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        self.inner.delete_pattern(pattern).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
