//! # seatkeeper-cache
//!
//! Expiring key/value stores holding the saga state that outlives a single
//! request: pending invitations and allocation authorizations.
//!
//! - **memory**: process-local map with per-entry deadlines and a sweeper task
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime from `cache.provider`.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
