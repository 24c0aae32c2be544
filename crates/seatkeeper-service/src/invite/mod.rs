//! Pending invitation records.

pub mod store;

pub use store::{InviteDraft, PendingInviteStore};
