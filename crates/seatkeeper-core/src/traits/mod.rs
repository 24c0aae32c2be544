//! Core traits defined in `seatkeeper-core` and implemented by other crates.

pub mod cache;

pub use cache::CacheProvider;
