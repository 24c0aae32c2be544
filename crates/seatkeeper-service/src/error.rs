//! Workflow-level failures and their taxonomy.

use thiserror::Error;
use uuid::Uuid;

use seatkeeper_client::ClientError;
use seatkeeper_core::error::{AppError, ErrorKind};
use seatkeeper_entity::license::{Product, ProductStatus};

/// How a caller should treat a failed workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Rejected before any side effect.
    Validation,
    /// Rejected by a read-only capacity check.
    Capacity,
    /// A referenced record does not exist (or has expired).
    NotFound,
    /// Failed midway; completed steps were compensated.
    PartialFailure,
    /// A collaborator or backing store could not be reached.
    Unavailable,
    /// Anything else.
    Internal,
}

/// Failure of a pool, invite, authorization or membership operation.
#[derive(Error, Debug)]
pub enum LicenseError {
    /// The workspace has no pool for the product.
    #[error("Workspace {workspace_id} has no {product} license")]
    ProductNotFound {
        /// Workspace.
        workspace_id: Uuid,
        /// Product asked for.
        product: Product,
    },

    /// The pool does not accept grants in its current status.
    #[error("{product} license is {status}")]
    ProductNotActive {
        /// Product.
        product: Product,
        /// Current pool status.
        status: ProductStatus,
    },

    /// Every purchased seat is taken.
    #[error("No {product} seat available")]
    NoSeatAvailable {
        /// Product.
        product: Product,
    },

    /// The user already holds a seat of the product.
    #[error("User {user_id} already holds a {product} seat")]
    AlreadyGranted {
        /// User.
        user_id: Uuid,
        /// Product.
        product: Product,
    },

    /// The user holds no seat of the product.
    #[error("User {user_id} holds no {product} seat")]
    SeatNotFound {
        /// User.
        user_id: Uuid,
        /// Product.
        product: Product,
    },

    /// The workspace has no active plan.
    #[error("Workspace {workspace_id} has no active license plan")]
    PlanNotFound {
        /// Workspace.
        workspace_id: Uuid,
    },

    /// Admitting more members would exceed the plan's member cap.
    #[error("Workspace allows {max_members} members: {current} present, {joining} joining")]
    SeatCapacityExceeded {
        /// Member cap.
        max_members: i64,
        /// Current headcount.
        current: i64,
        /// Members being admitted.
        joining: i64,
    },

    /// No account is registered for an invited email.
    #[error("No account is registered for {email}")]
    UnknownInvitee {
        /// Email that did not resolve.
        email: String,
    },

    /// The invitation was never issued, already answered, or expired.
    #[error("Invitation not found or expired")]
    InviteNotFound,

    /// The request would leave a member with no product.
    #[error("At least one product must be selected")]
    NoLicenseSelected,

    /// Requested resources exceed a global ceiling.
    #[error("Requested resources exceed the {resource} ceiling")]
    CapacityDenied {
        /// Ceiling that was exceeded.
        resource: &'static str,
    },

    /// The allocation authorization is missing, expired, or does not match.
    #[error("Allocation authorization is invalid or expired")]
    AuthorizationInvalid,

    /// The caller may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested role cannot be assigned this way.
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// The user is not a member of the workspace.
    #[error("User {user_id} is not a member of workspace {workspace_id}")]
    MemberNotFound {
        /// Workspace.
        workspace_id: Uuid,
        /// User.
        user_id: Uuid,
    },

    /// The user is already a member of the workspace.
    #[error("User {user_id} is already a member of workspace {workspace_id}")]
    AlreadyMember {
        /// Workspace.
        workspace_id: Uuid,
        /// User.
        user_id: Uuid,
    },

    /// An external collaborator failed.
    #[error("{service} is unavailable: {message}")]
    CollaboratorUnavailable {
        /// Collaborator name.
        service: &'static str,
        /// Failure description.
        message: String,
    },

    /// A workflow failed after some steps completed; those were undone.
    #[error(
        "{saga} failed at '{step}' ({compensated} step(s) compensated, {unreconciled} unreconciled): {source}"
    )]
    PartialFailure {
        /// Workflow name.
        saga: &'static str,
        /// Step that failed.
        step: String,
        /// Completed steps that were compensated.
        compensated: usize,
        /// Compensations that failed and need manual reconciliation.
        unreconciled: usize,
        /// The step failure.
        source: Box<LicenseError>,
    },

    /// Storage or TTL store failure.
    #[error(transparent)]
    Storage(#[from] AppError),
}

impl LicenseError {
    /// Taxonomy bucket of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoLicenseSelected
            | Self::InvalidRole(_)
            | Self::Forbidden(_)
            | Self::AlreadyGranted { .. }
            | Self::AlreadyMember { .. }
            | Self::AuthorizationInvalid => FailureKind::Validation,
            Self::NoSeatAvailable { .. }
            | Self::SeatCapacityExceeded { .. }
            | Self::CapacityDenied { .. }
            | Self::ProductNotActive { .. } => FailureKind::Capacity,
            Self::ProductNotFound { .. }
            | Self::SeatNotFound { .. }
            | Self::PlanNotFound { .. }
            | Self::UnknownInvitee { .. }
            | Self::InviteNotFound
            | Self::MemberNotFound { .. } => FailureKind::NotFound,
            Self::PartialFailure { .. } => FailureKind::PartialFailure,
            Self::CollaboratorUnavailable { .. } => FailureKind::Unavailable,
            Self::Storage(e) => match e.kind {
                ErrorKind::ServiceUnavailable | ErrorKind::Database | ErrorKind::Cache => {
                    FailureKind::Unavailable
                }
                ErrorKind::Validation => FailureKind::Validation,
                ErrorKind::NotFound => FailureKind::NotFound,
                _ => FailureKind::Internal,
            },
        }
    }

    /// Failure of an infrastructure dependency rather than of the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self.kind(), FailureKind::Unavailable | FailureKind::Internal)
    }
}

impl From<ClientError> for LicenseError {
    fn from(err: ClientError) -> Self {
        let service = match &err {
            ClientError::Unavailable { service, .. }
            | ClientError::Rejected { service, .. }
            | ClientError::Decode { service, .. } => *service,
            ClientError::Configuration(_) => "collaborator",
        };
        Self::CollaboratorUnavailable {
            service,
            message: err.to_string(),
        }
    }
}

impl From<LicenseError> for AppError {
    fn from(err: LicenseError) -> Self {
        let kind = match err.kind() {
            FailureKind::Validation => ErrorKind::Validation,
            FailureKind::Capacity => ErrorKind::Conflict,
            FailureKind::NotFound => ErrorKind::NotFound,
            FailureKind::Unavailable => ErrorKind::ServiceUnavailable,
            FailureKind::PartialFailure | FailureKind::Internal => ErrorKind::Internal,
        };
        match err {
            LicenseError::Storage(inner) => inner,
            other => AppError::new(kind, other.to_string()),
        }
    }
}
