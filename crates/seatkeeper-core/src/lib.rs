//! # seatkeeper-core
//!
//! Core crate for Seatkeeper. Contains the configuration schemas, the
//! TTL cache provider trait, and the unified infrastructure error.
//!
//! This crate has **no** internal dependencies on other Seatkeeper crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
