//! # seatkeeper-service
//!
//! Seat allocation and membership workflows. The pool manager owns seat
//! state, the TTL stores hold invitations and allocation tokens, and the
//! membership orchestrator runs the cross-service sagas over them.
//!
//! Services follow constructor injection: every dependency is supplied at
//! construction time and cloned cheaply behind `Arc`.

pub mod authorization;
pub mod code;
pub mod context;
pub mod error;
pub mod invite;
pub mod membership;
pub mod pool;
pub mod registry;
pub mod saga;

pub use authorization::{AllocationAuthorizationCache, AllocationOutcome};
pub use context::RequestContext;
pub use error::{FailureKind, LicenseError};
pub use invite::{InviteDraft, PendingInviteStore};
pub use membership::{
    DepartureReport, InviteRequest, MemberView, MembershipOrchestrator, ProvisionRequest,
    ProvisionedAccount, SecessionReport,
};
pub use pool::{LicensePoolManager, PurchaseRequest};
pub use registry::ServiceRegistry;
pub use saga::Saga;
