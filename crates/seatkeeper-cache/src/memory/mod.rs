//! In-memory TTL store.

pub mod store;

pub use store::MemoryCacheProvider;
