//! Single-use allocation authorizations bridging billing checks and pool writes.

pub mod cache;

pub use cache::{AllocationAuthorizationCache, AllocationOutcome};
