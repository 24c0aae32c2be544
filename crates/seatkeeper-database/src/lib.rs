//! # seatkeeper-database
//!
//! Storage traits for seat pools and workspace memberships, with a
//! PostgreSQL implementation and an in-memory implementation.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod provider;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryWorkspaceStore;
pub use provider::WorkspaceStores;
pub use repositories::{LicenseRepository, MembershipRepository};
pub use store::{LicenseStore, MembershipStore};
