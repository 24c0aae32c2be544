//! Process-local TTL store with per-entry deadlines.
//!
//! Expiry is checked on every read, so an elapsed entry is never visible
//! even before the sweeper removes it. Deadlines use Tokio's clock, which
//! tests can pause and advance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use seatkeeper_core::config::cache::MemoryCacheConfig;
use seatkeeper_core::error::AppError;
use seatkeeper_core::result::AppResult;
use seatkeeper_core::traits::cache::CacheProvider;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory TTL store.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    entries: Arc<DashMap<String, StoredValue>>,
    max_capacity: u64,
    sweep_interval: Duration,
}

impl MemoryCacheProvider {
    /// Create an empty store from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_capacity: config.max_capacity,
            sweep_interval: Duration::from_secs(config.sweep_interval_seconds.max(1)),
        }
    }

    /// Physically remove every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of physically stored entries, expired or not.
    pub fn stored_len(&self) -> usize {
        self.entries.len()
    }

    /// Run [`Self::sweep`] on the configured interval until `shutdown` flips.
    pub fn spawn_sweeper(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let store = self.clone();
        let period = self.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            info!(interval_secs = period.as_secs(), "TTL sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep();
                        if removed > 0 {
                            debug!(removed, "Swept expired entries");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("TTL sweeper stopped");
        })
    }

    /// Refuse a brand-new key once the store is full of live entries.
    fn ensure_room(&self, key: &str) -> AppResult<()> {
        if (self.entries.len() as u64) < self.max_capacity || self.entries.contains_key(key) {
            return Ok(());
        }
        self.sweep();
        if (self.entries.len() as u64) < self.max_capacity {
            Ok(())
        } else {
            Err(AppError::cache(format!(
                "In-memory TTL store is full ({} entries)",
                self.max_capacity
            )))
        }
    }
}

/// Match a key against a glob pattern supporting `*` and `?`.
fn glob_match(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();
    let (mut pi, mut ki) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
            pi += 1;
            ki += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ki));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ki = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.ensure_room(key)?;
        self.entries
            .insert(key.to_string(), StoredValue::new(value, ttl));
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.ensure_room(key)?;
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(occupied) if occupied.get().is_live(now) => Ok(false),
            Entry::Occupied(mut expired) => {
                expired.insert(StoredValue::new(value, ttl));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn take(&self, key: &str) -> AppResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, stored)| stored.is_live(now))
            .map(|(_, stored)| stored.value))
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, stored)| stored.is_live(now)))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .is_some_and(|stored| stored.is_live(now)))
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.expires_at.saturating_duration_since(now)))
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        let now = Instant::now();
        let mut count = 0u64;
        self.entries.retain(|key, stored| {
            if glob_match(pattern, key) {
                if stored.is_live(now) {
                    count += 1;
                }
                false
            } else {
                true
            }
        });
        debug!(pattern, count, "Deleted keys matching pattern");
        Ok(count)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
