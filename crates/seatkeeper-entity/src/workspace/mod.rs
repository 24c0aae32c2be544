//! Workspace membership entities.

pub mod filter;
pub mod member;
pub mod role;

pub use filter::MemberFilter;
pub use member::{MemberType, Membership};
pub use role::WorkspaceRole;
