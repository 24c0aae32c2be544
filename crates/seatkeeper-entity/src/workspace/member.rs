//! Workspace membership rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::WorkspaceRole;

/// How a member joined the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "workspace_member_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberType {
    /// Accepted an invitation with an existing account.
    Invited,
    /// Account created in bulk by a workspace manager.
    Provisioned,
}

/// A user's membership in a workspace, with its role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Membership {
    /// Workspace identifier.
    pub workspace_id: Uuid,
    /// Member's user identifier.
    pub user_id: Uuid,
    /// Assigned role.
    pub role: WorkspaceRole,
    /// How the member joined.
    pub member_type: MemberType,
    /// When the membership was created.
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Create a membership joined now.
    pub fn new(
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
        member_type: MemberType,
    ) -> Self {
        Self {
            workspace_id,
            user_id,
            role,
            member_type,
            joined_at: Utc::now(),
        }
    }
}
